use dvh_ingest::{DvhParser, ParseOptions};
use dvh_match::{
    ItemLaterality, MatchMethod, MatchedElement, PlanReference, ReferenceMatcher,
};
use dvh_model::{ElementType, Plan, Unit, Value};
use dvh_report::{Report, ReportElement, ResolvedValue, rerun_matching};

const SAMPLE_EXPORT: &str = "\
Patient Name: DOE^JOHN
Plan: LUNR1
Prescribed dose [Gy]: 60.0

Structure: PTV
Volume [cc]: 45.3

Dose [cGy] Ratio of Total Structure Volume [%]
      0        100
   5000         50
  10000          0

Structure: Lung_R
Volume [cc]: 1200.0

Dose [cGy] Ratio of Total Structure Volume [%]
      0        100
   2000         10
   4000          0
";

fn sample_plan() -> Plan {
    let mut parser = DvhParser::new(SAMPLE_EXPORT.as_bytes(), ParseOptions::default());
    parser.load_data().expect("parse sample export")
}

fn sample_report() -> Report {
    let mut report = Report::new("lung-template");
    let mut d50 = ReportElement::new(
        "PTV D50",
        PlanReference::new("PTV", ElementType::Structure).with_constructor("D50%"),
    );
    d50.unit = Some(Unit::Gray);
    report.push_element(d50);

    report.push_element(ReportElement::new(
        "Lung V20",
        PlanReference::new("Lung", ElementType::Structure)
            .with_laterality(ItemLaterality::Ipsilateral)
            .with_constructor("V20Gy"),
    ));

    let mut rx = ReportElement::new(
        "Prescription",
        PlanReference::new("Prescribed dose", ElementType::PlanProperty),
    );
    rx.unit = Some(Unit::CentiGray);
    report.push_element(rx);

    report.push_element(ReportElement::new(
        "Heart mean",
        PlanReference::new("Heart", ElementType::Structure),
    ));

    report.push_element(ReportElement::new(
        "PTV D110",
        PlanReference::new("PTV", ElementType::Structure).with_constructor("D110%"),
    ));

    report
}

#[test]
fn batch_match_partitions_elements() {
    let plan = sample_plan();
    let mut report = sample_report();
    let summary = report.match_elements(&ReferenceMatcher::default(), &plan);

    assert_eq!(
        summary.matched,
        vec!["PTV D50", "Lung V20", "Prescription", "PTV D110"]
    );
    assert_eq!(summary.unmatched, vec!["Heart mean"]);

    let lung = report.element("Lung V20").unwrap();
    assert_eq!(
        lung.reference.matched,
        Some(MatchedElement::new(ElementType::Structure, "Lung_R"))
    );
    assert_eq!(lung.reference.match_method, MatchMethod::Auto);
}

#[test]
fn values_interpolate_convert_and_leave_undefined() {
    let plan = sample_plan();
    let mut report = sample_report();
    report.match_elements(&ReferenceMatcher::default(), &plan);
    report.get_values(&plan);

    // D50% on the PTV curve is 5000 cGy, requested in Gy.
    assert_eq!(
        report.element("PTV D50").unwrap().value,
        Some(ResolvedValue::Number {
            value: 50.0,
            unit: Some(Unit::Gray),
        })
    );

    // V20Gy: threshold converted to the curve's cGy axis, result in the
    // curve's native percent column.
    assert_eq!(
        report.element("Lung V20").unwrap().value,
        Some(ResolvedValue::Number {
            value: 10.0,
            unit: Some(Unit::Percent),
        })
    );

    // Plain plan property passes through the unit converter.
    assert_eq!(
        report.element("Prescription").unwrap().value,
        Some(ResolvedValue::Number {
            value: 6000.0,
            unit: Some(Unit::CentiGray),
        })
    );

    // Unmatched element has nothing to extract.
    assert_eq!(report.element("Heart mean").unwrap().value, None);

    // Out-of-range point is undefined, not zero and not an error.
    assert_eq!(
        report.element("PTV D110").unwrap().value,
        Some(ResolvedValue::Undefined)
    );
}

#[test]
fn percent_target_scales_cell_value() {
    let plan = sample_plan();
    let mut report = sample_report();
    report.match_elements(&ReferenceMatcher::default(), &plan);
    report.get_values(&plan);

    let value = report.element("Lung V20").unwrap().value.clone().unwrap();
    assert_eq!(value.cell_value(Some("0.0%")), Some(Value::Number(0.1)));
}

#[test]
fn direct_entry_supplies_the_value() {
    let plan = sample_plan();
    let mut report = sample_report();
    report.match_elements(&ReferenceMatcher::default(), &plan);

    let mut direct = PlanReference::new("Heart", ElementType::Structure);
    direct.match_method = MatchMethod::DirectEntry;
    direct.direct_value = Some(Value::Number(12.5));
    assert!(report.update_ref("Heart mean", direct, &plan));

    report.get_values(&plan);
    assert_eq!(
        report.element("Heart mean").unwrap().value,
        Some(ResolvedValue::Number {
            value: 12.5,
            unit: None,
        })
    );
}

#[test]
fn manual_override_of_missing_element_clears_the_match() {
    let plan = sample_plan();
    let mut report = sample_report();

    let mut manual = PlanReference::new("Heart", ElementType::Structure);
    manual.matched = Some(MatchedElement::new(ElementType::Structure, "NotInPlan"));
    manual.match_method = MatchMethod::Manual;
    report.update_ref("Heart mean", manual, &plan);

    let element = report.element("Heart mean").unwrap();
    assert!(!element.reference.is_matched());
    assert_eq!(element.reference.match_method, MatchMethod::None);
}

#[test]
fn rerun_matching_replays_manual_decisions() {
    let plan = sample_plan();
    let mut report = sample_report();
    let matcher = ReferenceMatcher::default();
    report.match_elements(&matcher, &plan);

    // Operator binds the unmatched element by hand.
    let mut manual = PlanReference::new("Heart", ElementType::Structure);
    manual.matched = Some(MatchedElement::new(ElementType::Structure, "Lung_R"));
    manual.match_method = MatchMethod::Manual;
    report.update_ref("Heart mean", manual, &plan);

    // The corrected export is loaded again.
    let reloaded = sample_plan();
    let summary = rerun_matching(&mut report, &matcher, &reloaded);

    // Automatic matches reproduce identically and the manual decision
    // survives the reload.
    let lung = report.element("Lung V20").unwrap();
    assert_eq!(lung.reference.matched.as_ref().unwrap().name, "Lung_R");
    assert_eq!(lung.reference.match_method, MatchMethod::Auto);

    let heart = report.element("Heart mean").unwrap();
    assert_eq!(heart.reference.matched.as_ref().unwrap().name, "Lung_R");
    assert_eq!(heart.reference.match_method, MatchMethod::Manual);

    assert!(summary.unmatched.is_empty());
}

#[test]
fn history_records_only_real_transitions() {
    let plan = sample_plan();
    let mut report = sample_report();
    let matcher = ReferenceMatcher::default();

    report.match_elements(&matcher, &plan);
    let after_first = report.history().entries().len();
    assert!(after_first > 0);

    // Matching again against the same plan changes nothing.
    report.match_elements(&matcher, &plan);
    assert_eq!(
        report.history().changed().count(),
        report.history().entries().len()
    );
    assert_eq!(report.history().entries().len(), after_first);
}
