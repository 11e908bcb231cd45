//! Localization keys for the messages the dispatcher itself produces.

pub const INSUFFICIENT_RIGHTS: &str = "system.insufficient_rights";
pub const UNKNOWN_ERROR: &str = "system.unknown_error";
pub const UNDER_MAINTENANCE: &str = "system.under_maintenance";
/// Substitutions: `command`.
pub const COOLDOWN_NOTICE: &str = "system.cooldown_notice";

/// Built-in text for each key, as `(language, key, template)`.
pub const DEFAULTS: &[(&str, &str, &str)] = &[
    ("en", INSUFFICIENT_RIGHTS, "You don't have enough rights to use this command."),
    ("en", UNKNOWN_ERROR, "Something went wrong. Please try again later."),
    ("en", UNDER_MAINTENANCE, "This command is under maintenance. Please try again later."),
    ("en", COOLDOWN_NOTICE, "Command {command} is on cooldown, please wait."),
    ("ru", INSUFFICIENT_RIGHTS, "У вас недостаточно прав для использования этой команды."),
    ("ru", UNKNOWN_ERROR, "Произошла неизвестная ошибка. Попробуйте позже."),
    ("ru", UNDER_MAINTENANCE, "Эта команда находится на техническом обслуживании. Попробуйте позже."),
    ("ru", COOLDOWN_NOTICE, "Команда {command} на перезарядке, подождите."),
];
