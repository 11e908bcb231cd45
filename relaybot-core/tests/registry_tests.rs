// File: relaybot-core/tests/registry_tests.rs

use std::sync::Arc;

use relaybot_common::models::{CommandDescriptor, CommandRequest, CommandResult, Platform, ReplyContext};
use relaybot_core::Error;
use relaybot_core::repositories::{InMemoryCooldownStore, InMemoryUserStore, StaticLocalizer};
use relaybot_core::services::builtin_commands::register_builtins;
use relaybot_core::services::{
    CommandContext, CommandExecutor, CommandRegistry, DispatchOutcome, Dispatcher,
};

fn noop(_ctx: &CommandContext) -> Result<Option<CommandResult>, Error> {
    Ok(None)
}

#[test]
fn alias_clash_with_builtin_fails_the_build() {
    let registry = CommandRegistry::new(|b| {
        register_builtins(b)?;
        b.register(CommandDescriptor::new("shout").aliases(&["SAY"]), CommandExecutor::sync(noop))?;
        Ok(())
    });

    match registry.ensure_built() {
        Err(Error::DuplicateAlias { alias, existing, rejected }) => {
            assert_eq!(alias, "say");
            assert_eq!(existing, "echo");
            assert_eq!(rejected, "shout");
        }
        other => panic!("expected duplicate alias, got {:?}", other),
    }
    assert!(!registry.is_built());
}

#[test]
fn concurrent_first_resolves_see_one_table() {
    let registry = Arc::new(CommandRegistry::new(register_builtins));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = registry.clone();
            std::thread::spawn(move || r.resolve("Flip").map(|c| c.map(|c| c.descriptor.name.clone())))
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap().as_deref(), Some("coin"));
    }
    assert!(registry.is_built());
}

#[test]
fn registry_builds_lazily_on_first_dispatch() {
    let registry = Arc::new(CommandRegistry::new(register_builtins));
    let dispatcher = Dispatcher::builder(
        registry.clone(),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryCooldownStore::new()),
        Arc::new(StaticLocalizer::default()),
    )
    .build();
    assert!(!registry.is_built());

    let request = CommandRequest::new(
        Platform::DirectMessaging,
        "chat",
        "u1",
        "alice",
        "PING",
        vec![],
        ReplyContext::Direct { chat_id: "chat".into(), message_id: None },
    );
    // No sender for the platform: the reply is dropped with a warning.
    let outcome = tokio_test::block_on(dispatcher.dispatch(request));

    assert!(matches!(outcome, DispatchOutcome::Executed { replied: false }));
    assert!(registry.is_built());
}
