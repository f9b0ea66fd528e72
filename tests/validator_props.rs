//! Property checks for the image validator.

use lenscrl::validate::ValidationContext;
use lenscrl::{BBox, ImageValidator, Page, ValidatorConfig, Verdict};
use proptest::prelude::*;

fn placement() -> impl Strategy<Value = BBox> {
    (0.0f32..560.0, 0.0f32..740.0, 1.0f32..600.0, 1.0f32..600.0)
        .prop_map(|(x, y, w, h)| BBox::from_size(x, y, w, h))
}

proptest! {
    #[test]
    fn scores_stay_in_unit_interval(bbox in placement(), associated in any::<bool>()) {
        let page = Page::letter(0);
        let context = ValidationContext::new(associated, vec!["Figure 3".into(), "schéma".into()]);
        let analysis = ImageValidator::default().validate_image(&bbox, &page, Some(&context));

        prop_assert!((0.0..=1.0).contains(&analysis.quality));
        prop_assert!((0.0..=1.0).contains(&analysis.relevance));
        prop_assert!((0.0..=1.0).contains(&analysis.confidence));
        prop_assert_eq!(analysis.is_valid(), analysis.verdict == Verdict::Valid);
    }

    #[test]
    fn narrow_placements_are_invalid_size(x in 0.0f32..500.0, y in 0.0f32..700.0, w in 1.0f32..49.0, h in 1.0f32..600.0) {
        let bbox = BBox::from_size(x, y, w, h);
        let analysis = ImageValidator::default().validate_image(&bbox, &Page::letter(0), None);
        prop_assert_eq!(analysis.verdict, Verdict::InvalidSize);
    }

    #[test]
    fn relaxing_minimums_never_adds_size_rejections(
        bbox in placement(),
        min_side in 1.0f32..120.0,
        relax in 0.0f32..1.0,
        min_area in 100.0f32..20_000.0,
    ) {
        let page = Page::letter(0);
        let strict = ValidatorConfig::default()
            .with_min_size(min_side, min_side)
            .with_min_area(min_area);
        let loose = ValidatorConfig::default()
            .with_min_size(min_side * relax, min_side * relax)
            .with_min_area(min_area * relax);

        let strict = ImageValidator::new(strict).validate_image(&bbox, &page, None);
        let loose = ImageValidator::new(loose).validate_image(&bbox, &page, None);

        if loose.verdict == Verdict::InvalidSize {
            prop_assert_eq!(strict.verdict, Verdict::InvalidSize);
        }
    }

    #[test]
    fn keywords_never_lower_relevance(bbox in placement()) {
        let config = ValidatorConfig::default().with_duplicate_detection(false);
        let page = Page::letter(0);
        let mut validator = ImageValidator::new(config);

        let plain = ValidationContext::new(false, vec!["torque".into()]);
        let hinted = ValidationContext::new(false, vec!["torque".into(), "Figure".into()]);
        let without = validator.validate_image(&bbox, &page, Some(&plain));
        let with = validator.validate_image(&bbox, &page, Some(&hinted));

        prop_assert!(with.relevance >= without.relevance);
    }

    #[test]
    fn second_sighting_is_duplicate(bbox in placement()) {
        let page = Page::letter(0);
        let mut validator = ImageValidator::default();
        let first = validator.validate_image(&bbox, &page, None);
        let second = validator.validate_image(&bbox, &page, None);

        let reached_duplicate_stage = !matches!(
            first.verdict,
            Verdict::InvalidSize | Verdict::InvalidAspect | Verdict::Decoration
        );
        if reached_duplicate_stage {
            prop_assert_eq!(second.verdict, Verdict::Duplicate);
        } else {
            prop_assert_eq!(second.verdict, first.verdict);
        }
    }
}
