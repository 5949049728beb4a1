/// Property-based tests for handle lifecycles and address formatting.
///
/// Random sequences of start / wait / stop calls must never break the
/// handle's invariants:
/// - the readiness flag, once set, is never cleared
/// - a stopped handle holds no resource
/// - a handle is launched at most once and closed at most once per launch
mod common;

use common::*;
use proptest::prelude::*;
use service_harness::address::resolve_address;
use service_harness::platform::StaticPlatform;
use service_harness::{Context, Status};

#[derive(Debug, Clone, Copy)]
enum Operation {
    Start,
    WaitReady,
    Stop,
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Start),
        Just(Operation::WaitReady),
        Just(Operation::Stop),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    #[test]
    fn lifecycle_invariants_hold(
        ops in prop::collection::vec(operation_strategy(), 1..12),
        fatal in any::<bool>(),
        fail_launch in any::<bool>(),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let mut engine = FakeEngine::new();
            if fail_launch {
                engine = engine.failing_launch("svc");
            }
            let engine = engine.shared();
            let svc = if fatal {
                container("svc", ProbeChecker::fatal("nope").0)
            } else {
                container("svc", ProbeChecker::ready_after(1).0)
            };
            let ctx = Context::background();
            let mut was_ready = false;

            for op in &ops {
                let before = svc.status();
                let _ = match op {
                    Operation::Start => svc.start(&ctx, engine.clone()).await,
                    Operation::WaitReady => svc.wait_ready(&ctx).await,
                    Operation::Stop => svc.stop(&ctx).await,
                };
                let after = svc.status();

                if was_ready {
                    prop_assert!(svc.is_ready(), "readiness revoked after {:?}", op);
                }
                was_ready = svc.is_ready();

                prop_assert_eq!(after == Status::Ready, svc.is_ready() && after != Status::Stopped);
                if after == Status::Stopped {
                    prop_assert!(svc.resource().is_none());
                }
                if before.is_terminal() {
                    prop_assert!(after.is_terminal(), "{} -> {}", before, after);
                }
            }

            prop_assert!(engine.count("launch:svc") <= 1);
            prop_assert!(engine.count("close:svc") <= engine.count("launch:svc"));
            Ok(())
        })?;
    }

    #[test]
    fn address_shape(
        scheme in "[a-z]{0,8}",
        host_port in 1024u16..65535,
        gateway in (1u8..255, 0u8..255, 0u8..255, 1u8..255)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
        nested in any::<bool>(),
        quirk in any::<bool>(),
    ) {
        let platform = StaticPlatform::new(nested, quirk);
        let address = resolve_address(&scheme, &host_port.to_string(), &gateway, &platform);

        let suffix = format!(":{}", host_port);
        prop_assert!(address.ends_with(&suffix));
        prop_assert_eq!(address.contains("://"), !scheme.is_empty());

        let host = if nested && quirk { "127.0.0.1" } else { gateway.as_str() };
        let expected = if scheme.is_empty() {
            format!("{}:{}", host, host_port)
        } else {
            format!("{}://{}:{}", scheme, host, host_port)
        };
        prop_assert_eq!(address, expected);
    }
}
