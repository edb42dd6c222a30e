//! Running several effects.

use futures::future::join_all;

use super::{Effect, EffectResult, Environment};

/// Interpret `effects` in order, waiting for each before starting the next.
pub async fn sequence(
    env: &mut Environment,
    effects: impl IntoIterator<Item = Effect>,
) -> Vec<EffectResult> {
    let mut results = Vec::new();
    for effect in effects {
        results.push(env.execute(effect).wait().await);
    }
    results
}

/// Interpret `effects` in order, then wait for all pending results together.
///
/// Synchronous effects take effect in input order before anything is
/// awaited. Results keep input order.
pub async fn parallel(
    env: &mut Environment,
    effects: impl IntoIterator<Item = Effect>,
) -> Vec<EffectResult> {
    let completions: Vec<_> = effects.into_iter().map(|effect| env.execute(effect)).collect();
    join_all(completions.into_iter().map(|c| c.wait())).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::EngineConfig;
    use crate::effect::http::{HttpRequest, HttpResponse, HttpTransport};
    use crate::effect::{random, storage, timer, EffectValue};
    use crate::error::EffectError;

    struct Offline;

    #[async_trait::async_trait]
    impl HttpTransport for Offline {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, EffectError> {
            Err(EffectError::Transport("offline".into()))
        }
    }

    fn env() -> Environment {
        Environment::builder(EngineConfig::default().with_random_seed(1))
            .with_transport(Offline)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sequence_sees_earlier_writes() {
        let mut env = env();
        let results = sequence(
            &mut env,
            vec![storage::set_local("n", "1"), storage::get_local("n"), random::integer(5, 1)],
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[1], Ok(EffectValue::MaybeText(Some("1".into()))));
        assert!(results[2].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_waits_concurrently_and_keeps_order() {
        let mut env = env();
        let started = tokio::time::Instant::now();

        let results = parallel(
            &mut env,
            vec![timer::delay(100), timer::delay(50), storage::get_local("x")],
        )
        .await;

        assert_eq!(
            results,
            vec![
                Ok(EffectValue::Integer(100)),
                Ok(EffectValue::Integer(50)),
                Ok(EffectValue::MaybeText(None)),
            ]
        );
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}
