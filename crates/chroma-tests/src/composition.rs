//! Integration tests for pipeline composition.
//!
//! Ordering, combined-id determinism and failure semantics of a resolve,
//! across chroma-color, chroma-plugin and chroma-pipeline.

use crate::fixtures::{
    clip_frame, harness, CountingStage, TestPlugin, DISPLAY_ID, LINEARISE_ID,
};
use chroma_color::OpOrigin;
use chroma_pipeline::PipelineError;
use chroma_plugin::PluginError;
use std::sync::Arc;
use std::time::Duration;

// ── Concrete scenario ──────────────────────────────────────────

#[tokio::test]
async fn clip_without_plugins_is_linearise_then_display() {
    let h = harness(CountingStage::default(), &[]);
    let result = h.pipeline.resolve(&clip_frame(10)).await.unwrap();

    assert_eq!(result.len(), 2);
    let ops = result.operations();
    assert_eq!(ops[0].order_index, f32::NEG_INFINITY);
    assert_eq!(ops[0].cache_id, LINEARISE_ID);
    assert_eq!(ops[1].order_index, f32::INFINITY);
    assert_eq!(ops[1].cache_id, DISPLAY_ID);

    let concatenated = format!("{LINEARISE_ID}{DISPLAY_ID}");
    let expected = blake3::hash(concatenated.as_bytes()).to_hex().to_string();
    assert_eq!(result.cache_id(), expected);
}

#[tokio::test]
async fn one_plugin_sits_between_linearise_and_display() {
    let plugin = Arc::new(TestPlugin::new("grade", 0.0));
    let h = harness(CountingStage::default(), &[plugin.clone()]);
    let result = h.pipeline.resolve(&clip_frame(10)).await.unwrap();

    let origins: Vec<_> = result.operations().iter().map(|op| op.origin).collect();
    assert_eq!(
        origins,
        vec![OpOrigin::Linearise, OpOrigin::Plugin(plugin.id), OpOrigin::Display]
    );
    assert!(result.operation(OpOrigin::Plugin(plugin.id)).is_some());
}

// ── Ordering ───────────────────────────────────────────────────

#[tokio::test]
async fn linearise_first_display_last_for_any_plugin_count() {
    for count in 0..6 {
        let plugins: Vec<_> = (0..count)
            .map(|i| {
                // Extreme but finite indices must still land inside the chain.
                let order = if i % 2 == 0 { f32::MAX } else { f32::MIN };
                Arc::new(TestPlugin::new(&format!("p{i}"), order))
            })
            .collect();
        let h = harness(CountingStage::default(), &plugins);
        let result = h.pipeline.resolve(&clip_frame(0)).await.unwrap();

        let ops = result.operations();
        assert_eq!(ops.len(), count + 2);
        assert_eq!(ops.first().unwrap().origin, OpOrigin::Linearise);
        assert_eq!(ops.last().unwrap().origin, OpOrigin::Display);
        assert!(ops
            .windows(2)
            .all(|w| w[0].order_index <= w[1].order_index));
    }
}

#[tokio::test]
async fn non_finite_plugin_order_is_rejected() {
    for order in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
        let good = Arc::new(TestPlugin::new("grade", 0.0));
        let rogue = Arc::new(TestPlugin::new("rogue", order));
        let h = harness(CountingStage::default(), &[good, rogue]);

        let err = h.pipeline.resolve(&clip_frame(0)).await.unwrap_err();
        assert!(
            matches!(err, PipelineError::Plugin(PluginError::Invalid(_))),
            "order {order} gave {err}"
        );
        assert!(err.to_string().contains("rogue"));
        assert_eq!(h.pipeline.coordinator().shortcuts(), 0);
        assert!(h.cache.is_empty());
    }
}

// ── Determinism ────────────────────────────────────────────────

#[tokio::test]
async fn combined_id_independent_of_completion_order() {
    let orders = [-100.0, -5.0, 0.0, 7.5, 42.0];
    let mut ids = Vec::new();

    for round in 0..4u64 {
        // Rotate which plugin finishes first each round.
        let plugins: Vec<_> = orders
            .iter()
            .enumerate()
            .map(|(i, order)| {
                let slot = (i as u64 + round) % orders.len() as u64;
                Arc::new(
                    TestPlugin::new(&format!("op{i}"), *order)
                        .delayed(Duration::from_millis(5 * slot)),
                )
            })
            .collect();
        // Registration order reversed every other round as well.
        let plugins: Vec<_> = if round % 2 == 0 {
            plugins
        } else {
            plugins.into_iter().rev().collect()
        };

        let h = harness(CountingStage::default(), &plugins);
        let result = h.pipeline.resolve(&clip_frame(0)).await.unwrap();
        let names: Vec<_> = result
            .operations()
            .iter()
            .map(|op| op.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["linearise", "op0", "op1", "op2", "op3", "op4", "display"]
        );
        ids.push(result.cache_id().to_string());
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}

// ── Failure semantics ──────────────────────────────────────────

#[tokio::test]
async fn failing_linearise_does_not_wait_for_hanging_plugin() {
    let stage = CountingStage::default();
    stage
        .fail_linearise
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let h = harness(stage, &[Arc::new(TestPlugin::new("stuck", 0.0).hanging())]);

    let outcome = tokio::time::timeout(Duration::from_secs(5), h.pipeline.resolve(&clip_frame(0)))
        .await
        .expect("resolve must not wait for the plugin");
    assert!(matches!(
        outcome,
        Err(PipelineError::Stage { stage: "linearise", .. })
    ));
    assert_eq!(h.pipeline.coordinator().in_flight(), 0);
}

#[tokio::test]
async fn failing_display_does_not_wait_for_hanging_plugin() {
    let stage = CountingStage::default();
    stage
        .fail_display
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let h = harness(stage, &[Arc::new(TestPlugin::new("stuck", 0.0).hanging())]);

    let outcome = tokio::time::timeout(Duration::from_secs(5), h.pipeline.resolve(&clip_frame(0)))
        .await
        .expect("resolve must not wait for the plugin");
    assert!(outcome.is_err());
}

#[tokio::test]
async fn one_failing_plugin_fails_the_whole_resolve() {
    let good = Arc::new(TestPlugin::new("good", 1.0));
    let bad = Arc::new(TestPlugin::new("bad", 2.0).failing());
    let h = harness(CountingStage::default(), &[good.clone(), bad.clone()]);

    let err = h.pipeline.resolve(&clip_frame(0)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Plugin(_)));
    assert!(err.to_string().contains("bad"));

    // Nothing partial was recorded: no shortcut, nothing stored.
    assert_eq!(h.pipeline.coordinator().shortcuts(), 0);
    assert!(h.cache.is_empty());

    // A later resolve recomputes every stage again.
    assert!(h.pipeline.resolve(&clip_frame(0)).await.is_err());
    assert_eq!(h.pipeline.coordinator().executor().runs(), 2);
    assert_eq!(good.calls(), 2);
    assert_eq!(bad.calls(), 2);
}
