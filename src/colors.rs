use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Categories with static icon and color treatment.
pub const PREDEFINED_CATEGORIES: [&str; 5] = [
    "networking",
    "internship",
    "club events",
    "deadlines",
    "academic",
];

/// Backgrounds lighter than this get dark text.
pub const CONTRAST_LIGHTNESS_THRESHOLD: u8 = 65;

pub fn normalize_category(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn is_predefined(name: &str) -> bool {
    PREDEFINED_CATEGORIES.contains(&normalize_category(name).as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Hsl {
    /// Hue in [0,360), saturation in [60,80)%, lightness in [88,98)%.
    pub fn random_light<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            hue: rng.gen_range(0..360),
            saturation: rng.gen_range(60..80),
            lightness: rng.gen_range(88..98),
        }
    }

    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = f64::from(self.hue) / 360.0;
        let s = f64::from(self.saturation) / 100.0;
        let l = f64::from(self.lightness) / 100.0;

        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return (v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |mut t: f64| {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round() as u8
        };

        (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

impl FromStr for Hsl {
    type Err = String;

    /// Parses the `hsl(H, S%, L%)` text form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix("hsl(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("not an hsl() color: {}", s))?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let [hue, saturation, lightness] = parts.as_slice() else {
            return Err(format!("expected three components: {}", s));
        };
        let percent = |v: &str| -> Result<u8, String> {
            v.strip_suffix('%')
                .unwrap_or(v)
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| format!("bad percentage {} in {}", v, s))
        };
        Ok(Self {
            hue: hue
                .parse::<u16>()
                .ok()
                .filter(|h| *h < 360)
                .ok_or_else(|| format!("bad hue {} in {}", hue, s))?,
            saturation: percent(saturation)?,
            lightness: percent(lightness)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    /// Primary (dark) text.
    Dark,
    /// White text.
    Light,
}

/// Only the lightness channel is consulted.
pub fn contrast_for(color: Hsl) -> TextColor {
    if color.lightness > CONTRAST_LIGHTNESS_THRESHOLD {
        TextColor::Dark
    } else {
        TextColor::Light
    }
}

/// Session-lifetime assignment of generated colors to category names.
/// Entries are never removed, so a category deleted and recreated within
/// the same session keeps its color.
pub struct ColorAssigner {
    colors: HashMap<String, Hsl>,
    rng: StdRng,
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorAssigner {
    pub fn new() -> Self {
        Self {
            colors: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            colors: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `None` for predefined categories, which keep their static styling.
    pub fn color_for(&mut self, name: &str) -> Option<Hsl> {
        let normalized = normalize_category(name);
        if is_predefined(&normalized) {
            return None;
        }

        let rng = &mut self.rng;
        let color = *self.colors.entry(normalized).or_insert_with(|| {
            let color = Hsl::random_light(rng);
            tracing::debug!("Assigned {} to new category", color);
            color
        });
        Some(color)
    }

    #[cfg(test)]
    pub fn assigned(&self) -> usize {
        self.colors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_stable_for_normalized_name() {
        let mut colors = ColorAssigner::with_seed(7);
        let first = colors.color_for("Hackathons").unwrap();
        assert_eq!(colors.color_for("  hackathons ").unwrap(), first);
        assert_eq!(colors.color_for("HACKATHONS").unwrap(), first);
        assert_eq!(colors.assigned(), 1);
    }

    #[test]
    fn predefined_categories_get_no_color() {
        let mut colors = ColorAssigner::with_seed(1);
        for name in PREDEFINED_CATEGORIES {
            assert_eq!(colors.color_for(name), None);
        }
        assert_eq!(colors.color_for(" Club Events "), None);
        assert_eq!(colors.assigned(), 0);
    }

    #[test]
    fn generated_colors_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let color = Hsl::random_light(&mut rng);
            assert!(color.hue < 360);
            assert!((60..80).contains(&color.saturation));
            assert!((88..98).contains(&color.lightness));
        }
    }

    #[test]
    fn contrast_uses_lightness_threshold() {
        let at = |lightness| Hsl {
            hue: 120,
            saturation: 70,
            lightness,
        };
        assert_eq!(contrast_for(at(66)), TextColor::Dark);
        assert_eq!(contrast_for(at(CONTRAST_LIGHTNESS_THRESHOLD)), TextColor::Light);
        assert_eq!(contrast_for(at(30)), TextColor::Light);
    }

    #[test]
    fn formats_as_css_hsl() {
        let color = Hsl {
            hue: 210,
            saturation: 64,
            lightness: 91,
        };
        assert_eq!(color.to_string(), "hsl(210, 64%, 91%)");
        assert_eq!("hsl(210, 64%, 91%)".parse::<Hsl>(), Ok(color));
        assert_eq!(" hsl(210,64%,91%) ".parse::<Hsl>(), Ok(color));
    }

    #[test]
    fn rejects_malformed_hsl() {
        assert!("rgb(1, 2, 3)".parse::<Hsl>().is_err());
        assert!("hsl(400, 50%, 50%)".parse::<Hsl>().is_err());
        assert!("hsl(10, 50%)".parse::<Hsl>().is_err());
        assert!("hsl(10, 150%, 50%)".parse::<Hsl>().is_err());
    }

    #[test]
    fn converts_primaries_to_rgb() {
        let red = Hsl {
            hue: 0,
            saturation: 100,
            lightness: 50,
        };
        assert_eq!(red.to_rgb(), (255, 0, 0));
        let white = Hsl {
            hue: 0,
            saturation: 0,
            lightness: 100,
        };
        assert_eq!(white.to_rgb(), (255, 255, 255));
    }
}
