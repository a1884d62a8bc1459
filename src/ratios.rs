use crate::error::AnalysisError;
use crate::models::{DerivedMetrics, SpeakerRecord};

/// Response / Instruction and (Response + Question) / (Lecture + Instruction).
///
/// Zero denominators are not special-cased: the result is whatever IEEE
/// division gives (`inf` or `NaN`).
pub fn compute(record: &SpeakerRecord) -> DerivedMetrics {
    DerivedMetrics {
        pnr: record.response_count / record.instruction_count,
        idir: (record.response_count + record.question_count)
            / (record.lecture_count + record.instruction_count),
    }
}

/// Same as [`compute`], but refuses zero denominators.
///
/// Counts are non-negative, so the IDIR denominator can only be zero when
/// the PNR one is too.
pub fn compute_strict(record: &SpeakerRecord) -> Result<DerivedMetrics, AnalysisError> {
    if record.instruction_count == 0.0 {
        let (ratio, denominator) = if record.lecture_count == 0.0 {
            ("pnr and idir", "Instruction and Lecture + Instruction")
        } else {
            ("pnr", "Instruction")
        };
        return Err(AnalysisError::ComputationAmbiguity {
            speaker: record.speaker_id.clone(),
            ratio,
            denominator,
        });
    }
    Ok(compute(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn computes_both_ratios() {
        let metrics = compute(&SpeakerRecord::new("A", 2.0, 4.0, 1.0, 5.0));
        assert!((metrics.pnr - 1.25).abs() < 1e-9);
        assert!((metrics.idir - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_instruction_surfaces_infinity() {
        let metrics = compute(&SpeakerRecord::new("T", 3.0, 0.0, 0.0, 3.0));
        assert_eq!(metrics.pnr, f64::INFINITY);
        assert!((metrics.idir - 1.0).abs() < 1e-9);
    }

    #[test]
    fn all_zero_counts_surface_nan() {
        let metrics = compute(&SpeakerRecord::new("S", 0.0, 0.0, 0.0, 0.0));
        assert!(metrics.pnr.is_nan());
        assert!(metrics.idir.is_nan());
    }

    #[test]
    fn strict_mode_rejects_zero_instruction() {
        let err = compute_strict(&SpeakerRecord::new("T", 3.0, 0.0, 0.0, 3.0)).unwrap_err();
        match err {
            AnalysisError::ComputationAmbiguity { speaker, ratio, .. } => {
                assert_eq!(speaker, "T");
                assert_eq!(ratio, "pnr");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_mode_names_both_ratios_when_both_denominators_are_zero() {
        let err = compute_strict(&SpeakerRecord::new("S", 0.0, 0.0, 2.0, 0.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::ComputationAmbiguity { ratio: "pnr and idir", .. }));
    }

    #[test]
    fn strict_mode_passes_through_defined_ratios() {
        let record = SpeakerRecord::new("B", 10.0, 2.0, 0.0, 1.0);
        assert_eq!(compute_strict(&record).unwrap(), compute(&record));
    }

    proptest! {
        #[test]
        fn pnr_matches_formula(
            response in 0.0f64..1e6,
            instruction in 1e-3f64..1e6,
        ) {
            let record = SpeakerRecord::new("P", 0.0, instruction, 0.0, response);
            let metrics = compute(&record);
            prop_assert!((metrics.pnr - response / instruction).abs() <= 1e-9 * metrics.pnr.abs().max(1.0));
        }

        #[test]
        fn idir_matches_formula(
            lecture in 0.0f64..1e6,
            instruction in 1e-3f64..1e6,
            question in 0.0f64..1e6,
            response in 0.0f64..1e6,
        ) {
            let record = SpeakerRecord::new("P", lecture, instruction, question, response);
            let expected = (response + question) / (lecture + instruction);
            let metrics = compute(&record);
            prop_assert!((metrics.idir - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}
