use crate::models::{DerivedMetrics, Quadrant, QuadrantGroups};

/// Both axes are split at this value; ties go to the upper side.
pub const THRESHOLD: f64 = 1.0;

/// Place a (pnr, idir) pair in its engagement quadrant.
///
/// A NaN on either axis gives `Quadrant::Undefined`. Infinities compare
/// normally, so a speaker with responses but no instructions lands on the
/// high-PNR side.
pub fn classify(metrics: &DerivedMetrics) -> Quadrant {
    let DerivedMetrics { pnr, idir } = *metrics;

    if pnr >= THRESHOLD && idir >= THRESHOLD {
        Quadrant::Q1
    } else if pnr < THRESHOLD && idir >= THRESHOLD {
        Quadrant::Q2
    } else if pnr < THRESHOLD && idir < THRESHOLD {
        Quadrant::Q3
    } else if pnr >= THRESHOLD && idir < THRESHOLD {
        Quadrant::Q4
    } else {
        Quadrant::Undefined
    }
}

/// Group speakers by quadrant, keeping first-seen order inside each group.
/// Quadrants nobody falls in are left out of the map.
pub fn aggregate<'a, I>(rows: I) -> QuadrantGroups
where
    I: IntoIterator<Item = (&'a str, Quadrant)>,
{
    let mut groups = QuadrantGroups::new();
    for (speaker, quadrant) in rows {
        groups
            .entry(quadrant)
            .or_insert_with(Vec::new)
            .push(speaker.to_string());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(pnr: f64, idir: f64) -> Quadrant {
        classify(&DerivedMetrics { pnr, idir })
    }

    #[test]
    fn boundary_pairs_follow_the_upper_side() {
        assert_eq!(at(1.0, 1.0), Quadrant::Q1);
        assert_eq!(at(0.999, 1.0), Quadrant::Q2);
        assert_eq!(at(0.5, 0.5), Quadrant::Q3);
        assert_eq!(at(1.5, 0.5), Quadrant::Q4);
        assert_eq!(at(1.0, 0.999), Quadrant::Q4);
    }

    #[test]
    fn nan_never_falls_into_q4() {
        assert_eq!(at(f64::NAN, 0.5), Quadrant::Undefined);
        assert_eq!(at(1.5, f64::NAN), Quadrant::Undefined);
        assert_eq!(at(f64::NAN, f64::NAN), Quadrant::Undefined);
    }

    #[test]
    fn infinities_are_ordered() {
        assert_eq!(at(f64::INFINITY, 1.0), Quadrant::Q1);
        assert_eq!(at(f64::INFINITY, 0.2), Quadrant::Q4);
    }

    #[test]
    fn aggregate_keeps_first_seen_order_and_omits_empty_quadrants() {
        let rows = vec![
            ("C", Quadrant::Q3),
            ("A", Quadrant::Q1),
            ("B", Quadrant::Q3),
            ("D", Quadrant::Q1),
        ];
        let groups = aggregate(rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&Quadrant::Q1], vec!["A", "D"]);
        assert_eq!(groups[&Quadrant::Q3], vec!["C", "B"]);
        assert!(!groups.contains_key(&Quadrant::Q2));
        assert_eq!(
            groups.keys().copied().collect::<Vec<_>>(),
            vec![Quadrant::Q1, Quadrant::Q3]
        );
    }

    proptest! {
        #[test]
        fn finite_pairs_land_in_exactly_one_named_quadrant(
            pnr in -10.0f64..10.0,
            idir in -10.0f64..10.0,
        ) {
            let quadrant = at(pnr, idir);
            let matches = [
                pnr >= 1.0 && idir >= 1.0,
                pnr < 1.0 && idir >= 1.0,
                pnr < 1.0 && idir < 1.0,
                pnr >= 1.0 && idir < 1.0,
            ];
            prop_assert_eq!(matches.iter().filter(|m| **m).count(), 1);
            prop_assert_ne!(quadrant, Quadrant::Undefined);
            let index = matches.iter().position(|m| *m).unwrap();
            prop_assert_eq!(quadrant, Quadrant::ALL[index]);
        }

        #[test]
        fn every_speaker_lands_in_exactly_one_group(
            quadrants in proptest::collection::vec(0usize..5, 0..40),
        ) {
            let speakers: Vec<String> = (0..quadrants.len()).map(|i| format!("S{i}")).collect();
            let rows = speakers
                .iter()
                .zip(&quadrants)
                .map(|(s, q)| (s.as_str(), Quadrant::ALL[*q]));
            let groups = aggregate(rows);

            let mut seen: Vec<String> = groups.values().flatten().cloned().collect();
            seen.sort();
            let mut expected = speakers.clone();
            expected.sort();
            prop_assert_eq!(seen, expected);
        }
    }
}
