// Demo: render a keyed list, reorder it, then run a batch of effects

use anyhow::{Context, Result};
use arbor::effect::{self, compose, Environment};
use arbor::{element, Component, EngineConfig, Renderer, VNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn todo_item() -> Component {
    Component::new("TodoItem", |props| {
        let title = props.text("title").context("TodoItem needs a title")?;
        Ok(element("li").attr("className", "todo").child(title.to_string()).build()?)
    })
}

fn todo_list(item: &Component, titles: &[&str]) -> Result<VNode> {
    let rows = titles
        .iter()
        .map(|title| element(item).key(*title).attr("title", *title).build())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(element("ul").attr("id", "todos").children(rows).build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,arbor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env().context("Failed to load configuration")?;
    let mut env = Environment::new(config).context("Failed to build effect environment")?;

    let container = env.document().body();
    let mut renderer = Renderer::new(container);
    let item = todo_item();

    renderer.render(env.document_mut(), Some(todo_list(&item, &["milk", "eggs", "bread"])?))?;
    tracing::info!(html = %env.document().inner_html(container), "first render");

    let outcome =
        renderer.render(env.document_mut(), Some(todo_list(&item, &["bread", "milk", "eggs"])?))?;
    tracing::info!(
        ops = outcome.ops,
        report = %outcome.report,
        html = %env.document().inner_html(container),
        "reordered"
    );

    env.document_mut().mark_interactive();

    let results = compose::sequence(
        &mut env,
        vec![
            effect::dom::dom_ready(),
            effect::dom::query("#todos"),
            effect::storage::set_session("last-render", "2"),
            effect::random::uuid(),
            effect::datetime::get_current_time(),
            effect::timer::delay(10),
            effect::log::info("demo finished"),
        ],
    )
    .await;

    for result in results {
        match result {
            Ok(value) => tracing::info!(?value, "effect ok"),
            Err(error) => tracing::warn!(%error, "effect failed"),
        }
    }

    Ok(())
}
