use proptest::prelude::*;
use scoresheet2pgn::{
    detect_columns_automatically, find_table_boundaries, Boundary, GeometryParams,
};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn splits_are_strictly_increasing_and_complete(
        page in proptest_helpers::arb_noise_page(),
        expected in 1usize..=8,
        heuristics in any::<bool>(),
    ) {
        let params = GeometryParams::default();
        let cols = detect_columns_automatically(&page, None, heuristics, expected, &params);

        prop_assert_eq!(cols.len(), expected - 1);
        prop_assert!(cols.splits().windows(2).all(|w| w[0] < w[1]), "{:?}", cols.splits());
        prop_assert!(cols.splits().iter().all(|&x| x > 0 && x < page.width()), "{:?}", cols.splits());
    }

    #[test]
    fn splits_stay_inside_the_search_region(
        page in proptest_helpers::arb_noise_page(),
        expected in 2usize..=6,
        inset in 0u32..16,
    ) {
        let params = GeometryParams::default();
        let region = Boundary::new(inset, inset, page.width() - 2 * inset, page.height() - 2 * inset)
            .expect("non-empty region");
        let cols = detect_columns_automatically(&page, Some(region), true, expected, &params);

        prop_assert_eq!(cols.len(), expected - 1);
        for &x in cols.splits() {
            prop_assert!(x > region.x && x < region.right(), "{} outside {}", x, region);
        }
    }

    #[test]
    fn table_boundary_lies_within_the_image(page in proptest_helpers::arb_noise_page()) {
        let table = find_table_boundaries(&page, &GeometryParams::default());
        prop_assert!(table.width > 0 && table.height > 0);
        prop_assert!(table.right() <= page.width() && table.bottom() <= page.height(), "{}", table);
    }
}
