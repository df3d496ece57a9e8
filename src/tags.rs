use crate::colors::{self, ColorAssigner, Hsl, TextColor};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

/// Glyph used for any category without a dedicated icon.
pub const GENERIC_ICON: &str = "#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeStyle {
    /// Predefined category: fixed foreground, icon keeps its own color.
    Static(Color),
    /// Generated background with contrast text; the icon follows the text color.
    Assigned { background: Hsl, text: TextColor },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub name: String,
    pub icon: &'static str,
    pub style: BadgeStyle,
}

impl Badge {
    pub fn text_style(&self) -> Style {
        match self.style {
            BadgeStyle::Static(color) => Style::default().fg(color).add_modifier(Modifier::BOLD),
            BadgeStyle::Assigned { background, text } => {
                let (r, g, b) = background.to_rgb();
                Style::default()
                    .bg(Color::Rgb(r, g, b))
                    .fg(text_color(text))
            }
        }
    }

    pub fn icon_style(&self) -> Style {
        match self.style {
            BadgeStyle::Static(color) => Style::default().fg(color),
            BadgeStyle::Assigned { .. } => self.text_style(),
        }
    }
}

fn text_color(text: TextColor) -> Color {
    match text {
        TextColor::Dark => Color::Black,
        TextColor::Light => Color::White,
    }
}

pub fn category_icon(name: &str) -> &'static str {
    match colors::normalize_category(name).as_str() {
        "networking" => "≈",
        "internship" => "▣",
        "club events" => "◷",
        "deadlines" => "!",
        "academic" => "§",
        _ => GENERIC_ICON,
    }
}

fn static_color(name: &str) -> Color {
    match name {
        "networking" => Color::Yellow,
        "internship" => Color::Blue,
        "club events" => Color::Green,
        "deadlines" => Color::Red,
        _ => Color::Cyan,
    }
}

pub fn render_badge(name: &str, colors: &mut ColorAssigner) -> Badge {
    let normalized = colors::normalize_category(name);
    let style = match colors.color_for(&normalized) {
        Some(background) => BadgeStyle::Assigned {
            background,
            text: colors::contrast_for(background),
        },
        None => BadgeStyle::Static(static_color(&normalized)),
    };
    Badge {
        icon: category_icon(&normalized),
        name: normalized,
        style,
    }
}

/// Projects category names onto badges, in order. Rendering the same
/// names twice yields identical badges.
pub fn render_tags(names: &[String], colors: &mut ColorAssigner) -> Vec<Badge> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| render_badge(n, colors))
        .collect()
}

pub fn badge_spans(badges: &[Badge]) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(badges.len() * 3);
    for (i, badge) in badges.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(format!(" {}", badge.icon), badge.icon_style()));
        spans.push(Span::styled(format!(" {} ", badge.name), badge.text_style()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn predefined_tags_keep_static_style() {
        let mut colors = ColorAssigner::with_seed(3);
        let badges = render_tags(&names(&["Networking", "club events"]), &mut colors);
        assert_eq!(badges[0].name, "networking");
        assert_eq!(badges[0].icon, "≈");
        assert_eq!(badges[0].style, BadgeStyle::Static(Color::Yellow));
        assert_eq!(badges[1].icon, "◷");
        assert_eq!(colors.assigned(), 0);
    }

    #[test]
    fn generic_tags_get_assigned_colors() {
        let mut colors = ColorAssigner::with_seed(3);
        let badge = render_badge("Hackathons", &mut colors);
        assert_eq!(badge.icon, GENERIC_ICON);
        match badge.style {
            BadgeStyle::Assigned { background, text } => {
                assert_eq!(Some(background), colors.color_for("hackathons"));
                assert_eq!(text, TextColor::Dark);
            }
            other => panic!("expected assigned style, got {:?}", other),
        }
        assert_eq!(badge.icon_style(), badge.text_style());
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut colors = ColorAssigner::with_seed(9);
        let tags = names(&["research", "internship", "hackathons"]);
        let first = render_tags(&tags, &mut colors);
        let second = render_tags(&tags, &mut colors);
        assert_eq!(first, second);
    }

    #[test]
    fn blank_names_are_skipped() {
        let mut colors = ColorAssigner::with_seed(9);
        let badges = render_tags(&names(&["", "  ", "academic"]), &mut colors);
        assert_eq!(badges.len(), 1);
        assert_eq!((badges[0].icon, badges[0].name.as_str()), ("§", "academic"));
    }

    #[test]
    fn spans_separate_badges() {
        let mut colors = ColorAssigner::with_seed(9);
        let badges = render_tags(&names(&["networking", "deadlines"]), &mut colors);
        let spans = badge_spans(&badges);
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[2].content, " ");
    }
}
