//! Seeded random source generation for differential testing.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Snippets that exercise every rewrite pass
const IDIOMS: [&str; 9] = [
    "[-]",
    "[+]",
    "[<]",
    "[>]",
    "[->+<]",
    "[->++>+++<<]",
    "[<+++>-]",
    ">+<",
    "<->",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGenConfig {
    /// Number of generation steps (each emits a character or an idiom)
    pub length: usize,
    /// Maximum loop nesting
    pub max_depth: usize,
    /// Probability of opening a loop at each step
    pub loop_rate: f32,
    /// Probability of closing the innermost loop at each step
    pub close_rate: f32,
    /// Probability of inserting a known idiom
    pub idiom_rate: f32,
    /// Probability of emitting `.` or `,`
    pub io_rate: f32,
    /// Leading `>` so early left moves stay on the tape
    pub padding: usize,
}

impl Default for SourceGenConfig {
    fn default() -> Self {
        Self {
            length: 48,
            max_depth: 3,
            loop_rate: 0.08,
            close_rate: 0.15,
            idiom_rate: 0.15,
            io_rate: 0.05,
            padding: 8,
        }
    }
}

pub struct SourceGenerator {
    config: SourceGenConfig,
}

impl SourceGenerator {
    pub fn new(config: SourceGenConfig) -> Self {
        Self { config }
    }

    /// Generate a source text with balanced brackets
    pub fn generate(&self, rng: &mut ChaCha8Rng) -> String {
        let mut source = ">".repeat(self.config.padding);
        let mut depth = 0usize;

        for _ in 0..self.config.length {
            let roll = rng.gen::<f32>();
            if roll < self.config.idiom_rate {
                if let Some(idiom) = IDIOMS.choose(rng) {
                    source.push_str(idiom);
                }
                continue;
            }

            if depth < self.config.max_depth && rng.gen::<f32>() < self.config.loop_rate {
                source.push('[');
                depth += 1;
                continue;
            }

            if depth > 0 && rng.gen::<f32>() < self.config.close_rate {
                source.push(']');
                depth -= 1;
                continue;
            }

            if rng.gen::<f32>() < self.config.io_rate {
                source.push(if rng.gen_bool(0.5) { '.' } else { ',' });
                continue;
            }

            let c = match rng.gen_range(0..4) {
                0 => '+',
                1 => '-',
                2 => '>',
                _ => '<',
            };
            source.push(c);
        }

        source.extend(std::iter::repeat(']').take(depth));
        source
    }
}

impl Default for SourceGenerator {
    fn default() -> Self {
        Self::new(SourceGenConfig::default())
    }
}
