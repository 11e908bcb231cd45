// File: relaybot-core/tests/dispatcher_tests.rs

mod test_utils;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use relaybot_common::models::{
    CommandDescriptor, CommandResult, ExecutionKind, Platform, RequiredRole,
};
use mockall::predicate::{always, eq};
use relaybot_common::traits::{MockLocalizer, MockUserRoleStore, UserRoleStore};
use relaybot_core::Error;
use relaybot_core::config::DispatcherConfig;
use relaybot_core::eventbus::BotEvent;
use relaybot_core::repositories::{InMemoryCooldownStore, InMemoryUserStore};
use relaybot_core::services::{
    AsyncCommandHandler, CommandContext, CommandExecutor, CommandRegistry, DenyReason,
    DispatchOutcome, Dispatcher,
};

use test_utils::helpers::*;

const GENERIC_EN: &str = "Something went wrong. Please try again later.";

fn leaky(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Err(Error::Platform("db password=hunter2 rejected".into()))
}

fn reports_failure(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(Some(CommandResult::failure("upstream returned 502")))
}

fn silent(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(Some(CommandResult::text("")))
}

fn nothing(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(None)
}

fn explodes(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    panic!("index out of range")
}

fn echo_args(ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(Some(CommandResult::text(ctx.args_joined())))
}

struct Sleepy;

#[async_trait]
impl AsyncCommandHandler for Sleepy {
    async fn execute(&self, _ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(Some(CommandResult::text("finally")))
    }
}

struct AsyncPanic;

#[async_trait]
impl AsyncCommandHandler for AsyncPanic {
    async fn execute(&self, _ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
        tokio::task::yield_now().await;
        panic!("async body blew up")
    }
}

#[tokio::test]
async fn unknown_command_logs_once_and_sends_nothing() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("ping"), CommandExecutor::sync(silent))?;
        Ok(())
    });
    let (logs, _guard) = capture_logs();

    let outcome = h.dispatcher.dispatch(stream_request("u1", "nosuch", &[])).await;

    assert!(matches!(outcome, DispatchOutcome::NotFound));
    assert_eq!(h.stream.count(), 0);
    assert_eq!(logs.lines_containing("Unknown command 'nosuch'"), 1);
    assert_eq!(logs.lines_containing("completed in"), 1);
}

#[tokio::test]
async fn banned_user_is_suppressed_without_running_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let h = Harness::new(move |b| {
        b.register(CommandDescriptor::new("hello"), CommandExecutor::sync(counting_handler(c.clone(), "hi")))?;
        Ok(())
    });
    h.users.ban(Platform::StreamChat, "u1");
    h.users.ignore(Platform::Guild, "u2");

    let banned = h.dispatcher.dispatch(stream_request("u1", "hello", &[])).await;
    let ignored = h.dispatcher.dispatch(guild_request("u2", "hello", &[])).await;

    assert!(matches!(banned, DispatchOutcome::Suppressed));
    assert!(matches!(ignored, DispatchOutcome::Suppressed));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.stream.count() + h.guild.count(), 0);
}

#[tokio::test]
async fn maintenance_sends_placeholder_and_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let h = Harness::new(move |b| {
        b.register(
            CommandDescriptor::new("weather").maintenance(true),
            CommandExecutor::sync(counting_handler(c.clone(), "sunny")),
        )?;
        Ok(())
    });

    let outcome = h.dispatcher.dispatch(stream_request("u1", "weather", &["oslo"])).await;

    assert!(matches!(outcome, DispatchOutcome::Maintenance));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.stream.texts(),
        vec!["This command is under maintenance. Please try again later."]
    );
}

#[tokio::test]
async fn handler_error_is_isolated_from_the_user() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("boom"), CommandExecutor::sync(leaky))?;
        Ok(())
    });
    let (logs, _guard) = capture_logs();

    let outcome = h.dispatcher.dispatch(stream_request("u1", "boom", &["a", "b"])).await;

    match outcome {
        DispatchOutcome::HandlerFault(Error::CommandFailed { command, arguments, user_id, cause }) => {
            assert_eq!(command, "boom");
            assert_eq!(arguments, "a b");
            assert_eq!(user_id, "u1");
            assert!(cause.contains("hunter2"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(h.stream.texts(), vec![GENERIC_EN]);
    let logged = logs.contents();
    assert!(logged.contains("Command 'boom' failed for user 'u1' (args: 'a b')"));
    assert!(logged.contains("hunter2"));
}

#[tokio::test]
async fn error_result_takes_the_error_path() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("fetch"), CommandExecutor::sync(reports_failure))?;
        Ok(())
    });

    let outcome = h.dispatcher.dispatch(guild_request("u1", "fetch", &[])).await;

    assert!(matches!(outcome, DispatchOutcome::HandlerFault(_)));
    assert_eq!(h.guild.texts(), vec![GENERIC_EN]);
    assert!(!h.guild.texts()[0].contains("502"));
}

#[tokio::test]
async fn panics_become_handler_faults() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("sync"), CommandExecutor::sync(explodes))?;
        b.register(
            CommandDescriptor::new("async").kind(ExecutionKind::Asynchronous),
            CommandExecutor::r#async(AsyncPanic),
        )?;
        Ok(())
    });

    for name in ["sync", "async"] {
        match h.dispatcher.dispatch(stream_request("u1", name, &[])).await {
            DispatchOutcome::HandlerFault(Error::CommandFailed { cause, .. }) => {
                assert!(cause.starts_with("Handler panicked"), "cause was {}", cause);
            }
            other => panic!("unexpected outcome for {}: {:?}", name, other),
        }
    }
    assert_eq!(h.stream.texts(), vec![GENERIC_EN, GENERIC_EN]);

    // The user's lock survived both panics.
    assert!(matches!(
        h.dispatcher.dispatch(stream_request("u1", "sync", &[])).await,
        DispatchOutcome::HandlerFault(_)
    ));
}

#[tokio::test]
async fn missing_result_is_logged_as_a_defect() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("void"), CommandExecutor::sync(nothing))?;
        b.register(CommandDescriptor::new("quiet"), CommandExecutor::sync(silent))?;
        Ok(())
    });
    let (logs, _guard) = capture_logs();

    let missing = h.dispatcher.dispatch(stream_request("u1", "void", &[])).await;
    let empty = h.dispatcher.dispatch(stream_request("u1", "quiet", &[])).await;

    assert!(matches!(missing, DispatchOutcome::MissingResult));
    assert!(matches!(empty, DispatchOutcome::Executed { replied: false }));
    assert_eq!(h.stream.count(), 0);
    assert_eq!(logs.lines_containing("returned no result"), 1);
}

#[tokio::test]
async fn insufficient_role_gets_localized_rights_message() {
    let h = Harness::new(|b| {
        b.register(
            CommandDescriptor::new("reload").role(RequiredRole::BotModerator),
            CommandExecutor::sync(echo_args),
        )?;
        Ok(())
    });
    h.users.set_language(Platform::Guild, "u1", "ru");

    let denied = h.dispatcher.dispatch(guild_request("u1", "reload", &["all"])).await;
    assert!(matches!(denied, DispatchOutcome::Denied(DenyReason::InsufficientRole)));
    assert_eq!(
        h.guild.texts(),
        vec!["У вас недостаточно прав для использования этой команды."]
    );

    h.users.grant_developer(Platform::Guild, "u1");
    let allowed = h.dispatcher.dispatch(guild_request("u1", "reload", &["all"])).await;
    assert!(matches!(allowed, DispatchOutcome::Executed { replied: true }));
    assert_eq!(h.guild.texts().last().map(String::as_str), Some("all"));
}

#[tokio::test]
async fn channel_moderation_only_counts_on_stream_chat() {
    let h = Harness::new(|b| {
        b.register(
            CommandDescriptor::new("title").role(RequiredRole::ChannelModerator),
            CommandExecutor::sync(echo_args),
        )?;
        Ok(())
    });
    h.users.grant_channel_moderator("100", "mod");
    h.users.grant_channel_moderator("g-chan", "mod");

    let on_stream = h.dispatcher.dispatch(stream_request("mod", "title", &["new"])).await;
    let on_guild = h.dispatcher.dispatch(guild_request("mod", "title", &["new"])).await;

    assert!(matches!(on_stream, DispatchOutcome::Executed { replied: true }));
    assert!(matches!(on_guild, DispatchOutcome::Denied(DenyReason::InsufficientRole)));
}

#[tokio::test]
async fn unsupported_platform_is_silent() {
    let h = Harness::new(|b| {
        b.register(
            CommandDescriptor::new("clip").platforms(&[Platform::StreamChat]),
            CommandExecutor::sync(echo_args),
        )?;
        Ok(())
    });

    let outcome = h.dispatcher.dispatch(guild_request("u1", "clip", &[])).await;

    assert!(matches!(outcome, DispatchOutcome::Denied(DenyReason::Unsupported)));
    assert_eq!(h.guild.count(), 0);
}

#[tokio::test]
async fn five_second_cooldown_blocks_one_second_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let h = Harness::new(move |b| {
        b.register(
            CommandDescriptor::new("roll").cooldown(5, 0),
            CommandExecutor::sync(counting_handler(c.clone(), "4")),
        )?;
        Ok(())
    });

    let first = h.dispatcher.dispatch(stream_request("u1", "roll", &[])).await;
    h.clock.advance(chrono::Duration::seconds(1));
    let second = h.dispatcher.dispatch(stream_request("u1", "roll", &[])).await;

    assert!(matches!(first, DispatchOutcome::Executed { replied: true }));
    assert!(matches!(second, DispatchOutcome::Denied(DenyReason::RateLimited)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Silent by default.
    assert_eq!(h.stream.texts(), vec!["4"]);

    // Another user is not affected.
    let other = h.dispatcher.dispatch(stream_request("u2", "roll", &[])).await;
    assert!(matches!(other, DispatchOutcome::Executed { .. }));
}

#[tokio::test]
async fn five_second_cooldown_allows_six_second_retry() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("roll").cooldown(5, 0), CommandExecutor::sync(echo_args))?;
        Ok(())
    });

    let first = h.dispatcher.dispatch(stream_request("u1", "roll", &["x"])).await;
    h.clock.advance(chrono::Duration::seconds(6));
    let second = h.dispatcher.dispatch(stream_request("u1", "roll", &["y"])).await;

    assert!(matches!(first, DispatchOutcome::Executed { .. }));
    assert!(matches!(second, DispatchOutcome::Executed { .. }));
    assert_eq!(h.stream.texts(), vec!["x", "y"]);
}

#[tokio::test]
async fn cooldown_notice_when_the_command_asks_for_it() {
    let h = Harness::new(|b| {
        b.register(
            CommandDescriptor::new("roll").cooldown(0, 30).notify_on_cooldown(true),
            CommandExecutor::sync(echo_args),
        )?;
        Ok(())
    });

    h.dispatcher.dispatch(stream_request("u1", "roll", &["1"])).await;
    let limited = h.dispatcher.dispatch(stream_request("u2", "roll", &["2"])).await;

    assert!(matches!(limited, DispatchOutcome::Denied(DenyReason::RateLimited)));
    assert_eq!(
        h.stream.texts(),
        vec!["1", "Command roll is on cooldown, please wait."]
    );
}

#[tokio::test]
async fn store_failure_is_an_infrastructure_fault_in_default_language() {
    let mut mock = MockUserRoleStore::new();
    mock.expect_get_authorization()
        .with(eq(Platform::StreamChat), always())
        .times(1)
        .returning(|_, _| Err(Error::Store("connection refused".into())));
    mock.expect_is_channel_moderator().never();

    let config = DispatcherConfig { default_language: "ru".into(), ..Default::default() };
    let role_store: Arc<dyn UserRoleStore> = Arc::new(mock);
    let h = Harness::with_stores(
        |b| {
            b.register(CommandDescriptor::new("ping"), CommandExecutor::sync(echo_args))?;
            Ok(())
        },
        config,
        Arc::new(InMemoryUserStore::new()),
        role_store,
    );

    let outcome = h.dispatcher.dispatch(stream_request("u1", "ping", &[])).await;

    assert!(matches!(outcome, DispatchOutcome::InfrastructureFault(Error::Store(_))));
    assert_eq!(h.stream.texts(), vec!["Произошла неизвестная ошибка. Попробуйте позже."]);
}

#[tokio::test(start_paused = true)]
async fn slow_handler_times_out_and_releases_the_lock() {
    let config = DispatcherConfig { handler_timeout_secs: 5, ..Default::default() };
    let h = Harness::with_config(
        |b| {
            b.register(
                CommandDescriptor::new("slow").kind(ExecutionKind::Asynchronous),
                CommandExecutor::r#async(Sleepy),
            )?;
            b.register(CommandDescriptor::new("fast"), CommandExecutor::sync(echo_args))?;
            Ok(())
        },
        config,
    );

    let outcome = h.dispatcher.dispatch(stream_request("u1", "slow", &[])).await;
    match outcome {
        DispatchOutcome::HandlerFault(Error::CommandFailed { cause, .. }) => {
            assert!(cause.contains("Timeout"), "cause was {}", cause);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let next = h.dispatcher.dispatch(stream_request("u1", "fast", &["ok"])).await;
    assert!(matches!(next, DispatchOutcome::Executed { replied: true }));
    assert_eq!(h.stream.texts(), vec![GENERIC_EN, "ok"]);
}

#[tokio::test]
async fn audit_events_follow_test_mode() {
    let h = Harness::new(|b| {
        b.register(CommandDescriptor::new("ping"), CommandExecutor::sync(echo_args))?;
        Ok(())
    });
    let mut rx = h.bus.subscribe(Some(16)).await;

    h.dispatcher.dispatch(stream_request("u1", "ping", &["x"])).await;

    match rx.recv().await {
        Some(BotEvent::CommandExecuted(usage)) => {
            assert_eq!(usage.command_name, "ping");
            assert_eq!(usage.user_id, "u1");
            assert_eq!(usage.usage_text.as_deref(), Some("ping x"));
        }
        other => panic!("expected usage, got {:?}", other),
    }
    assert!(matches!(
        rx.recv().await,
        Some(BotEvent::CommandCompleted { outcome: "executed", .. })
    ));

    let config = DispatcherConfig { test_mode: true, ..Default::default() };
    let quiet = Harness::with_config(
        |b| {
            b.register(CommandDescriptor::new("ping"), CommandExecutor::sync(echo_args))?;
            Ok(())
        },
        config,
    );
    let mut rx = quiet.bus.subscribe(Some(16)).await;
    quiet.dispatcher.dispatch(stream_request("u1", "ping", &[])).await;
    assert!(matches!(rx.recv().await, Some(BotEvent::CommandCompleted { .. })));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn denied_requests_are_not_audited() {
    let h = Harness::new(|b| {
        b.register(
            CommandDescriptor::new("reload").role(RequiredRole::BotDeveloper),
            CommandExecutor::sync(echo_args),
        )?;
        Ok(())
    });
    let mut rx = h.bus.subscribe(Some(16)).await;

    h.dispatcher.dispatch(guild_request("u1", "reload", &[])).await;

    assert!(matches!(
        rx.recv().await,
        Some(BotEvent::CommandCompleted { outcome: "denied", .. })
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn cooldown_notice_is_localized_with_the_command_name() {
    let mut localizer = MockLocalizer::new();
    localizer
        .expect_get_string()
        .times(1)
        .returning(|language, key, _channel, platform, subs| {
            let subs: Vec<String> = subs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}/{}/{}/{}", language, key, platform, subs.join(","))
        });

    let stream = RecordingSender::new(Platform::StreamChat);
    let dispatcher = Dispatcher::builder(
        Arc::new(CommandRegistry::new(|b| {
            b.register(
                CommandDescriptor::new("roll").aliases(&["dice"]).cooldown(60, 0).notify_on_cooldown(true),
                CommandExecutor::sync(silent),
            )?;
            Ok(())
        })),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryCooldownStore::new()),
        Arc::new(localizer),
    )
    .sender(stream.clone())
    .build();

    dispatcher.dispatch(stream_request("u1", "dice", &[])).await;
    let limited = dispatcher.dispatch(stream_request("u1", "dice", &[])).await;

    assert!(matches!(limited, DispatchOutcome::Denied(DenyReason::RateLimited)));
    assert_eq!(stream.texts(), vec!["en/system.cooldown_notice/stream-chat/command=roll"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timed_out_sync_handler_keeps_the_user_locked_until_it_returns() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (r, p) = (running.clone(), peak.clone());
    let config = DispatcherConfig { handler_timeout_secs: 1, ..Default::default() };
    let h = Harness::with_config(
        move |b| {
            let (r, p) = (r.clone(), p.clone());
            b.register(
                CommandDescriptor::new("grind"),
                CommandExecutor::sync(move |_ctx: &CommandContext| -> Result<Option<CommandResult>, Error> {
                    let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(1500));
                    r.fetch_sub(1, Ordering::SeqCst);
                    Ok(Some(CommandResult::text("done")))
                }),
            )?;
            Ok(())
        },
        config,
    );
    let dispatcher = h.dispatcher.clone();

    let first = tokio::spawn({
        let d = dispatcher.clone();
        async move { d.dispatch(stream_request("u1", "grind", &[])).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = dispatcher.dispatch(stream_request("u1", "grind", &[])).await;
    let first = first.await.unwrap();

    for outcome in [first, second] {
        match outcome {
            DispatchOutcome::HandlerFault(Error::CommandFailed { cause, .. }) => {
                assert!(cause.contains("Timeout"), "cause was {}", cause);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(running.load(Ordering::SeqCst), 0);
}
