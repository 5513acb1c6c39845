#[path = "../src/test_support.rs"]
mod test_support;

use blocklink_rs::{Blocklink, LinkageError};
use test_support::{dedupe_config, scored_self_link};

#[test]
fn self_link_distribution_proportions() -> anyhow::Result<()> {
    let mut linker = Blocklink::new(dedupe_config())?;
    linker.engine_mut().register(
        "self_link",
        scored_self_link(&[(-2.0, 0.80), (-2.0, 0.80), (4.3, 0.95)]),
    )?;

    let records = linker.unlinkables("self_link", "match_probability")?;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].match_probability, 0.80);
    assert!((records[0].proportion - 2.0 / 3.0).abs() < 1e-9);
    assert!((records[0].cumulative_proportion - 2.0 / 3.0).abs() < 1e-9);

    assert_eq!(records[1].match_probability, 0.95);
    assert!((records[1].proportion - 1.0 / 3.0).abs() < 1e-9);
    assert!((records[1].cumulative_proportion - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn certain_matches_are_excluded_from_the_output() -> anyhow::Result<()> {
    let mut linker = Blocklink::new(dedupe_config())?;
    linker.engine_mut().register(
        "self_link",
        scored_self_link(&[(-2.0, 0.80), (12.5, 1.0), (13.0, 1.0)]),
    )?;

    let records = linker.unlinkables("self_link", "match_weight")?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].match_probability, 0.80);
    // Certain matches stay in the denominator.
    assert!((records[0].proportion - 1.0 / 3.0).abs() < 1e-9);
    assert!((records[0].cumulative_proportion - 1.0 / 3.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn both_axes_produce_the_same_records() -> anyhow::Result<()> {
    let mut linker = Blocklink::new(dedupe_config())?;
    linker.engine_mut().register(
        "self_link",
        scored_self_link(&[(-4.0, 0.2), (-1.0, 0.6), (3.0, 0.9)]),
    )?;

    let by_weight = linker.unlinkables("self_link", "match_weight")?;
    let by_probability = linker.unlinkables("self_link", "match_probability")?;
    assert_eq!(by_weight, by_probability);
    Ok(())
}

#[test]
fn invalid_axis_is_rejected_before_any_execution() -> anyhow::Result<()> {
    let linker = Blocklink::new(dedupe_config())?;
    // The self-link table is never registered: a valid axis would be an
    // execution error, an invalid one must fail earlier.
    let err = linker.unlinkables("self_link", "weight").unwrap_err();
    assert!(matches!(err, LinkageError::Configuration(_)));

    let err = linker.unlinkables("self_link", "match_weight").unwrap_err();
    assert!(matches!(err, LinkageError::Execution { .. }));
    Ok(())
}

#[test]
fn scores_are_rounded_before_grouping() -> anyhow::Result<()> {
    let mut linker = Blocklink::new(dedupe_config())?;
    linker.engine_mut().register(
        "self_link",
        scored_self_link(&[(-2.004, 0.500_001), (-1.996, 0.499_999), (1.0, 0.75)]),
    )?;

    let records = linker.unlinkables("self_link", "match_probability")?;
    // Both 0.5-ish probabilities round to the same 5-decimal bucket.
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].match_probability, 0.5);
    assert!((records[0].proportion - 2.0 / 3.0).abs() < 1e-9);
    // Bucket weight is the maximum of the rounded weights.
    assert_eq!(records[0].match_weight, -2.0);
    Ok(())
}
