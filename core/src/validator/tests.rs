//! Tests for the type checker and lint rules

use maplit::btreemap;

use super::*;
use crate::parser::{parse, parse_type};

// ============================================================================
// Helper Functions
// ============================================================================

fn ty(source: &str) -> Type {
    parse_type(source).expect("type should parse")
}

fn env(entries: &[(&str, &str)]) -> TypeEnvironment {
    entries
        .iter()
        .map(|(name, sig)| (name.to_string(), ty(sig)))
        .collect()
}

/// Parse and validate against an empty base environment
fn check(source: &str) -> ValidationReport {
    let program = parse(source).expect("Parse should succeed");
    validate(&program, &TypeEnvironment::new())
}

fn kinds(report: &ValidationReport) -> Vec<TypeErrorKind> {
    report.errors.iter().map(|e| e.kind).collect()
}

fn has_lint(report: &ValidationReport, rule_id: &str) -> bool {
    report.warnings.iter().any(|w| w.rule_id == rule_id)
}

const PIPELINE: &str = r#"
fetch :: () -> Data
process :: Data -> Result
"#;

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_composition_infers_outer_codomain() {
    let report = check(&format!("{}process ∘ fetch", PIPELINE));

    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> Result")));
}

#[test]
fn test_composition_mismatch_reports_both_sides() {
    let report = check(&format!("{}fetch ∘ process", PIPELINE));

    assert!(!report.success);
    assert_eq!(kinds(&report), vec![TypeErrorKind::CompositionMismatch]);
    let error = &report.errors[0];
    assert_eq!(error.expected, Some(Type::Unit));
    assert_eq!(error.actual, Some(Type::mono("Result")));
    assert_eq!(error.subject, "(fetch ∘ process)");
    assert!(error.message.contains("Result"));
    assert!(report.program_type.is_none());
    assert!(report.environment.is_none());
}

#[test]
fn test_three_stage_pipeline() {
    let report = check(
        r#"
build :: () -> Artifact
test :: Artifact -> Report
deploy :: Report -> Release
deploy ∘ test ∘ build
"#,
    );
    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> Release")));
}

#[test]
fn test_type_variable_is_substituted_through_composition() {
    let report = check(&format!("{}id :: a -> a\nprocess ∘ id ∘ fetch", PIPELINE));

    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> Result")));
}

#[test]
fn test_type_variable_codomain_resolved_from_inner() {
    let report = check(&format!("{}id :: a -> a\nid ∘ fetch", PIPELINE));
    assert_eq!(report.program_type, Some(ty("() -> Data")));
}

#[test]
fn test_non_function_signature_is_constant() {
    let report = check("config :: Settings\nload :: Settings -> App\nload ∘ config");
    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> App")));
}

// ============================================================================
// Product
// ============================================================================

#[test]
fn test_product_pairs_codomains() {
    let report = check("f :: A -> B\ng :: A -> C\nf × g");

    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("A -> (B × C)")));
}

#[test]
fn test_product_requires_same_domain() {
    let report = check("f :: A -> B\nh :: D -> E\nf × h");

    assert_eq!(kinds(&report), vec![TypeErrorKind::ProductMismatch]);
    assert_eq!(report.errors[0].expected, Some(Type::mono("A")));
    assert_eq!(report.errors[0].actual, Some(Type::mono("D")));
}

#[test]
fn test_product_feeding_a_join() {
    let report = check(
        r#"
frontend :: Plan -> Bundle
backend :: Plan -> Binary
plan :: () -> Plan
release :: Bundle × Binary -> Release
release ∘ (frontend × backend) ∘ plan
"#,
    );
    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> Release")));
}

#[test]
fn test_product_with_variable_domain_takes_concrete_side() {
    let report = check("dup :: a -> a\nf :: A -> B\ndup × f");
    assert_eq!(report.program_type, Some(ty("A -> (A × B)")));
}

// ============================================================================
// Unbound names and error collection
// ============================================================================

#[test]
fn test_unbound_task_named() {
    let report = check("fetch :: () -> Data\nmystery ∘ fetch");

    assert!(!report.success);
    assert_eq!(kinds(&report), vec![TypeErrorKind::UnboundTask]);
    assert!(report.errors[0].message.contains("'mystery'"));
    assert_eq!(report.errors[0].subject, "mystery");
}

#[test]
fn test_all_errors_collected_in_source_order() {
    let report = check(
        r#"
fetch :: () -> Data
process :: Data -> Result
bad = fetch ∘ process
ghost ∘ fetch × nobody
"#,
    );

    assert_eq!(
        kinds(&report),
        vec![
            TypeErrorKind::CompositionMismatch,
            TypeErrorKind::UnboundTask,
            TypeErrorKind::UnboundTask,
        ]
    );
    let lines: Vec<usize> = report.errors.iter().map(|e| e.span.start_line).collect();
    assert_eq!(lines, vec![3, 4, 4]);
}

#[test]
fn test_errors_do_not_cascade() {
    // The unbound literal is reported once; the enclosing composition is
    // untypeable but not reported again.
    let report = check("process :: Data -> Result\nprocess ∘ missing");
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn test_base_environment_is_used_and_overridden() {
    let program = parse("process :: Data -> Summary\nprocess ∘ fetch").unwrap();
    let base = env(&[("fetch", "() -> Data"), ("process", "Data -> Result")]);

    let report = validate(&program, &base);

    assert!(report.success);
    assert_eq!(report.program_type, Some(ty("() -> Summary")));
    let snapshot = report.environment.expect("snapshot on success");
    assert_eq!(snapshot.get("process"), Some(&ty("Data -> Summary")));
}

// ============================================================================
// Functors
// ============================================================================

#[test]
fn test_functor_type_bound_for_later_use() {
    let report = check(
        r#"
build :: () -> Artifact
test :: Artifact -> Report
deploy :: Report -> Release
functor ci = deploy ∘ test ∘ build
ci
"#,
    );

    assert!(report.success, "{}", report.render());
    assert_eq!(report.program_type, Some(ty("() -> Release")));
    let snapshot = report.environment.unwrap();
    assert_eq!(snapshot.get("ci"), Some(&ty("() -> Release")));
}

#[test]
fn test_functor_shadows_signature() {
    let report = check(
        r#"
fetch :: () -> Data
step :: () -> Nothing
step = fetch
use :: Data -> Out
use ∘ step
"#,
    );
    assert!(report.success, "{}", report.render());
    assert!(has_lint(&report, "shadowed-task"));
}

#[test]
fn test_broken_functor_reported_once() {
    let report = check(
        r#"
process :: Data -> Result
broken = process ∘ nowhere
broken
"#,
    );
    assert_eq!(kinds(&report), vec![TypeErrorKind::UnboundTask]);
}

#[test]
fn test_side_table_covers_every_node() {
    let program = parse(&format!("{}process ∘ fetch", PIPELINE)).unwrap();
    let report = validate(&program, &TypeEnvironment::new());

    assert_eq!(report.node_types.len(), 3);
    assert_eq!(report.type_of(program.root.id()), Some(&ty("() -> Result")));
    if let crate::ast::Node::Composition { inner, .. } = &program.root {
        assert_eq!(report.type_of(inner.id()), Some(&ty("() -> Data")));
    }
}

// ============================================================================
// Lints
// ============================================================================

#[test]
fn test_unused_functor_warns_without_failing() {
    let report = check(&format!("{}spare = process\nprocess ∘ fetch", PIPELINE));

    assert!(report.success);
    assert!(has_lint(&report, "unused-functor"));
    assert!(report.warnings[0].message.contains("'spare'"));
}

#[test]
fn test_lints_are_warnings() {
    let report = check(&format!("{}spare = process\nprocess ∘ fetch", PIPELINE));
    let json = serde_json::to_value(&report.warnings[0]).unwrap();

    assert_eq!(report.warnings[0].severity, Severity::Warning);
    assert_eq!(json["severity"], serde_json::json!("warning"));
    assert!(report.warnings[0].to_string().starts_with("warning at "));
}

#[test]
fn test_functor_used_by_later_functor_is_not_unused() {
    let report = check(&format!(
        "{}stage = process\nfull = stage ∘ fetch\nfull",
        PIPELINE
    ));
    assert!(!has_lint(&report, "unused-functor"));
}

#[test]
fn test_without_lints() {
    let program = parse(&format!("{}spare = process\nprocess ∘ fetch", PIPELINE)).unwrap();
    let report = Validator::without_lints().validate(&program, &TypeEnvironment::new());
    assert!(report.warnings.is_empty());
    assert_eq!(Validator::new().rules().count(), 2);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_validation_is_idempotent() {
    let source = format!("{}bad = fetch ∘ process\nprocess ∘ ghost", PIPELINE);
    let program = parse(&source).unwrap();

    let first = validate(&program, &TypeEnvironment::new());
    let second = validate(&program, &TypeEnvironment::new());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_reparse_and_revalidate_is_identical() {
    let source = format!("{}out = process ∘ fetch\nout", PIPELINE);
    let base = env(&[("unused", "A -> B")]);

    let first = validate(&parse(&source).unwrap(), &base);
    let second = validate(&parse(&source).unwrap(), &base);

    assert_eq!(first, second);
}

#[test]
fn test_report_serializes_node_types() {
    let report = check(&format!("{}process ∘ fetch", PIPELINE));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["success"], serde_json::json!(true));
    let expected = btreemap! { "0" => true, "1" => true, "2" => true };
    for key in expected.keys() {
        assert!(json["node_types"].get(*key).is_some(), "missing node {}", key);
    }
}
