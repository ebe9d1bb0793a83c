#![allow(dead_code)]

use image::{GrayImage, Luma};
use proptest::prelude::*;
use proptest::sample::Index;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use scoresheet2pgn::chess::{san_with, BoardState};
use scoresheet2pgn::RasterImage;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Grey-level noise page, 64–160 px wide and 64–120 px tall.
pub fn arb_noise_page() -> BoxedStrategy<RasterImage> {
    (64u32..=160, 64u32..=120)
        .prop_flat_map(|(w, h)| {
            (
                Just(w),
                Just(h),
                prop::collection::vec(any::<u8>(), (w * h) as usize),
            )
        })
        .prop_map(|(w, h, pixels)| {
            let img = GrayImage::from_fn(w, h, |x, y| Luma([pixels[(y * w + x) as usize]]));
            RasterImage::from(img)
        })
        .boxed()
}

/// A game played from the start position, one `(white, black)` SAN pair
/// per entry. Black is `None` only on the last entry.
#[derive(Debug, Clone)]
pub struct LegalGame {
    pub pairs: Vec<(String, Option<String>)>,
    pub final_fen: String,
}

impl LegalGame {
    /// One numbered pair per line, as a scoresheet column would read.
    pub fn to_text(&self) -> String {
        self.pairs
            .iter()
            .enumerate()
            .map(|(i, (white, black))| match black {
                Some(black) => format!("{}. {} {}", i + 1, white, black),
                None => format!("{}. {}", i + 1, white),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn sans(&self) -> Vec<&str> {
        self.pairs
            .iter()
            .flat_map(|(w, b)| std::iter::once(w.as_str()).chain(b.as_deref()))
            .collect()
    }
}

/// Random walk over legal moves, stopping early on mate or stalemate.
pub fn arb_legal_game(max_plies: usize) -> BoxedStrategy<LegalGame> {
    prop::collection::vec(any::<Index>(), 1..=max_plies)
        .prop_map(|picks| {
            let mut board = BoardState::standard();
            let mut sans = Vec::new();
            for pick in picks {
                let legal = board.legal_moves();
                if legal.is_empty() {
                    break;
                }
                let mv = *pick.get(&legal);
                sans.push(san_with(&board, &mv, &legal));
                board = board.play(&mv);
            }
            let pairs = sans
                .chunks(2)
                .map(|c| (c[0].clone(), c.get(1).cloned()))
                .collect();
            LegalGame {
                pairs,
                final_fen: board.to_fen(),
            }
        })
        .boxed()
}

/// Move-like text drawn from the English whitelist, without spaces or
/// trailing punctuation.
pub fn arb_move_token() -> BoxedStrategy<String> {
    "[abcdefgh1-8KQRBNO0o:×X+#=-]{1,8}".boxed()
}
