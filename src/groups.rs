use serde::Serialize;

use crate::features::ColorInfo;

/// Name of the catch-all group, always at index 0
pub const MISC_GROUP: &str = "Miscellaneous";

/// Default confidence below which an image falls back to [`MISC_GROUP`]
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

/// A named HSV region. `hue_min > hue_max` wraps through 0 degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorGroup {
    pub name: String,
    pub hue_min: f64,
    pub hue_max: f64,
    pub sat_min: f64,
    pub sat_max: f64,
    pub bright_min: f64,
    pub bright_max: f64,
    pub representative: [u8; 3],
}

impl ColorGroup {
    pub fn new(
        name: &str,
        hue: (f64, f64),
        sat: (f64, f64),
        bright: (f64, f64),
        representative: [u8; 3],
    ) -> Self {
        Self {
            name: name.to_string(),
            hue_min: hue.0,
            hue_max: hue.1,
            sat_min: sat.0,
            sat_max: sat.1,
            bright_min: bright.0,
            bright_max: bright.1,
            representative,
        }
    }

    fn wraps(&self) -> bool {
        self.hue_min > self.hue_max
    }

    fn hue_matches(&self, hue: f64) -> bool {
        if self.wraps() {
            hue >= self.hue_min || hue <= self.hue_max
        } else {
            hue >= self.hue_min && hue <= self.hue_max
        }
    }

    /// 1.0 inside the region, otherwise decays with the distance to it
    pub fn color_score(&self, color: &ColorInfo) -> f64 {
        let inside = self.hue_matches(color.hue)
            && (self.sat_min..=self.sat_max).contains(&color.saturation)
            && (self.bright_min..=self.bright_max).contains(&color.brightness);
        if inside {
            return 1.0;
        }

        let hue_dist = (if self.wraps() {
            [
                (color.hue - self.hue_min).abs(),
                (color.hue - self.hue_max).abs(),
                (color.hue - (self.hue_min - 360.0)).abs(),
                (color.hue - (self.hue_max + 360.0)).abs(),
            ]
            .into_iter()
            .fold(f64::INFINITY, f64::min)
        } else {
            (color.hue - self.hue_min).abs().min((color.hue - self.hue_max).abs())
        }) / 180.0;

        let sat_dist = (self.sat_min - color.saturation)
            .max(color.saturation - self.sat_max)
            .max(0.0);
        let bright_dist = (self.bright_min - color.brightness)
            .max(color.brightness - self.bright_max)
            .max(0.0);

        (1.0 - (hue_dist + sat_dist + bright_dist) / 3.0).max(0.0)
    }

    /// Weight-averaged score of a palette, in [0, 1]
    pub fn score(&self, colors: &[ColorInfo]) -> f64 {
        let mut score = 0.0;
        let mut total_weight = 0.0;
        for color in colors {
            score += self.color_score(color) * color.weight;
            total_weight += color.weight;
        }
        if total_weight > 0.0 {
            (score / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// The predefined wallpaper groups. Index 0 is the catch-all.
pub fn default_groups() -> Vec<ColorGroup> {
    vec![
        ColorGroup::new(MISC_GROUP, (0.0, 0.0), (0.0, 0.0), (0.0, 0.0), [0, 0, 0]),
        ColorGroup::new("Blue_Cool", (200.0, 260.0), (0.3, 1.0), (0.3, 1.0), [50, 100, 255]),
        ColorGroup::new("Red_Warm", (340.0, 20.0), (0.3, 1.0), (0.3, 1.0), [255, 50, 50]),
        ColorGroup::new("Green_Nature", (80.0, 140.0), (0.3, 1.0), (0.3, 1.0), [100, 255, 50]),
        ColorGroup::new("Orange_Sunset", (20.0, 50.0), (0.4, 1.0), (0.4, 1.0), [255, 165, 50]),
        ColorGroup::new("Purple_Mystical", (260.0, 300.0), (0.3, 1.0), (0.3, 1.0), [200, 50, 255]),
        ColorGroup::new("Yellow_Bright", (50.0, 80.0), (0.4, 1.0), (0.5, 1.0), [255, 255, 50]),
        ColorGroup::new("Pink_Soft", (300.0, 340.0), (0.3, 1.0), (0.4, 1.0), [255, 100, 200]),
        ColorGroup::new("Cyan_Tech", (160.0, 200.0), (0.4, 1.0), (0.4, 1.0), [100, 200, 255]),
        ColorGroup::new("Dark_Moody", (0.0, 360.0), (0.0, 1.0), (0.0, 0.25), [40, 40, 40]),
        ColorGroup::new("Light_Minimal", (0.0, 360.0), (0.0, 0.3), (0.8, 1.0), [240, 240, 240]),
        ColorGroup::new("Monochrome", (0.0, 360.0), (0.0, 0.15), (0.25, 0.8), [128, 128, 128]),
        ColorGroup::new("Earth_Tones", (25.0, 45.0), (0.2, 0.7), (0.3, 0.7), [200, 150, 100]),
    ]
}

/// Winning group for a palette
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMatch {
    pub group_id: usize,
    pub group_name: String,
    pub score: f64,
}

/// Scores a palette against every group except the catch-all.
///
/// The first group with the strictly highest score wins. Below
/// `min_confidence` the image goes to group 0 but keeps its best score.
pub fn assign_group(colors: &[ColorInfo], groups: &[ColorGroup], min_confidence: f64) -> GroupMatch {
    let mut best_id = 0;
    let mut best_score = 0.0;

    for (id, group) in groups.iter().enumerate().skip(1) {
        let score = group.score(colors);
        if score > best_score {
            best_score = score;
            best_id = id;
        }
    }

    if best_score < min_confidence {
        best_id = 0;
    }

    GroupMatch {
        group_id: best_id,
        group_name: groups
            .get(best_id)
            .map(|group| group.name.clone())
            .unwrap_or_else(|| MISC_GROUP.to_string()),
        score: best_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(hue: f64, saturation: f64, brightness: f64, weight: f64) -> ColorInfo {
        ColorInfo {
            rgb: [0, 0, 0],
            weight,
            hue,
            saturation,
            brightness,
        }
    }

    #[test]
    fn test_exact_match_scores_one() {
        let groups = default_groups();
        let blue = &groups[1];
        assert_eq!(blue.score(&[color(230.0, 0.8, 0.7, 1.0)]), 1.0);
    }

    #[test]
    fn test_red_wraps_around_zero() {
        let groups = default_groups();
        let red = &groups[2];
        assert_eq!(red.color_score(&color(355.0, 0.9, 0.9, 1.0)), 1.0);
        assert_eq!(red.color_score(&color(10.0, 0.9, 0.9, 1.0)), 1.0);
        assert!(red.color_score(&color(180.0, 0.9, 0.9, 1.0)) < 1.0);
    }

    #[test]
    fn test_wrapped_hue_distance_uses_shifted_bounds() {
        let groups = default_groups();
        let red = &groups[2];
        // 30 degrees is 10 past hue_max=20
        let expected = 1.0 - (10.0 / 180.0) / 3.0;
        assert!((red.color_score(&color(30.0, 0.9, 0.9, 1.0)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_partial_score_counts_hue_edge_distance() {
        let groups = default_groups();
        let blue = &groups[1];
        // hue 230 is 30 degrees from either edge; saturation is 0.2 short
        let expected = 1.0 - (30.0 / 180.0 + 0.2 + 0.0) / 3.0;
        assert!((blue.color_score(&color(230.0, 0.1, 0.7, 1.0)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_assign_picks_best_group() {
        let groups = default_groups();
        let palette = vec![color(120.0, 0.8, 0.8, 0.7), color(230.0, 0.8, 0.8, 0.3)];
        let matched = assign_group(&palette, &groups, DEFAULT_MIN_CONFIDENCE);
        assert_eq!(matched.group_name, "Green_Nature");
        assert_eq!(matched.group_id, 3);
        assert!(matched.score > 0.7 && matched.score <= 1.0);
    }

    #[test]
    fn test_low_confidence_falls_back_to_misc() {
        let groups = default_groups();
        let palette = vec![color(120.0, 0.8, 0.8, 1.0)];
        let matched = assign_group(&palette, &groups, 1.1);
        assert_eq!(matched.group_id, 0);
        assert_eq!(matched.group_name, MISC_GROUP);
        assert_eq!(matched.score, 1.0);
    }

    #[test]
    fn test_empty_palette_is_misc() {
        let matched = assign_group(&[], &default_groups(), DEFAULT_MIN_CONFIDENCE);
        assert_eq!(matched.group_id, 0);
        assert_eq!(matched.score, 0.0);
    }
}
