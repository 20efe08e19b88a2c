// Colored terminal output for classifier results.

use colored::Colorize;

use crate::bias::{BiasDistribution, BiasLabel};
use crate::neutralize::{ModelTier, CENTER_THRESHOLD};

/// Width of the probability bars, in characters.
const BAR_WIDTH: usize = 40;

/// Display a bias distribution as labeled bars, dominant label highlighted.
pub fn display_bias(text: &str, bias: &BiasDistribution) {
    println!("\n{}", "=== Bias Analysis ===".bold());
    println!("  {}", super::truncate_chars(text, 100).dimmed());
    println!();

    let dominant = bias.dominant();
    for (label, probability) in bias.entries() {
        let name = format!("{:<6}", label.as_str());
        let name = if label == dominant {
            colorize_label(label, &name).bold()
        } else {
            colorize_label(label, &name)
        };
        println!("  {} {} {:>5.1}%", name, bar(probability), probability * 100.0);
    }

    println!();
    let tier = ModelTier::select(bias);
    let note = match tier {
        ModelTier::Advanced => format!(
            "Center below {CENTER_THRESHOLD}: rewrites would use the advanced model"
        ),
        ModelTier::Standard => format!(
            "Center at or above {CENTER_THRESHOLD}: rewrites would use the standard model"
        ),
    };
    println!("  {}", note.dimmed());
}

fn bar(probability: f64) -> String {
    let filled = (probability.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn colorize_label(label: BiasLabel, text: &str) -> colored::ColoredString {
    match label {
        BiasLabel::Left => text.blue(),
        BiasLabel::Center => text.green(),
        BiasLabel::Right => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width_is_constant() {
        for p in [0.0, 0.333, 0.5, 1.0, 1.7, -0.2] {
            assert_eq!(bar(p).chars().count(), BAR_WIDTH);
        }
        assert_eq!(bar(1.0), "#".repeat(BAR_WIDTH));
    }
}
