use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use crossterm::style::{Attribute, Color, ContentStyle};
use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal};

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, ContentStyle>,
}

impl Theme {
    pub fn from_config(enabled: bool, config: &UserThemeConfig) -> Self {
        let mut styles: HashMap<ThemeToken, ContentStyle> = ThemeToken::all()
            .iter()
            .map(|token| (*token, preset_style(config.preset, *token)))
            .collect();
        for (token, override_style) in &config.styles {
            let base = styles.get(token).copied().unwrap_or_default();
            styles.insert(*token, merge_style(base, override_style));
        }

        Self { enabled, styles }
    }

    /// Colors only when writing to a terminal and `NO_COLOR` is unset.
    pub fn detect(config: &UserThemeConfig) -> Self {
        let enabled = env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self::from_config(enabled, config)
    }

    pub fn style(&self, token: ThemeToken) -> ContentStyle {
        if !self.enabled {
            return ContentStyle::default();
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }

    pub fn paint(&self, token: ThemeToken, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }

        self.style(token).apply(text).to_string()
    }
}

fn preset_style(preset: ThemePreset, token: ThemeToken) -> ContentStyle {
    match preset {
        ThemePreset::Default => default_preset_style(token),
        ThemePreset::Light => light_preset_style(token),
        ThemePreset::HighContrast => high_contrast_preset_style(token),
    }
}

fn default_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::UserPrompt => fg(rgb(158, 206, 106), &[Attribute::Bold]),
        ThemeToken::TutorLabel => fg(rgb(122, 162, 247), &[Attribute::Bold]),
        ThemeToken::TutorText => fg(rgb(192, 202, 245), &[]),
        ThemeToken::TutorWaiting => fg(rgb(138, 138, 138), &[Attribute::Italic]),
        ThemeToken::TutorError => fg(rgb(247, 118, 142), &[]),
        ThemeToken::SystemInfo => fg(rgb(86, 95, 137), &[]),
        ThemeToken::SystemError => fg(rgb(247, 118, 142), &[Attribute::Bold]),
        ThemeToken::Banner => fg(rgb(224, 175, 104), &[Attribute::Bold]),
    }
}

fn light_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::UserPrompt => fg(rgb(56, 118, 29), &[Attribute::Bold]),
        ThemeToken::TutorLabel => fg(rgb(36, 84, 178), &[Attribute::Bold]),
        ThemeToken::TutorText => fg(rgb(40, 44, 52), &[]),
        ThemeToken::TutorWaiting => fg(rgb(110, 110, 110), &[Attribute::Italic]),
        ThemeToken::TutorError => fg(rgb(180, 30, 60), &[]),
        ThemeToken::SystemInfo => fg(rgb(90, 90, 120), &[]),
        ThemeToken::SystemError => fg(rgb(180, 30, 60), &[Attribute::Bold]),
        ThemeToken::Banner => fg(rgb(150, 90, 0), &[Attribute::Bold]),
    }
}

fn high_contrast_preset_style(token: ThemeToken) -> ContentStyle {
    match token {
        ThemeToken::UserPrompt => fg(Color::Green, &[Attribute::Bold]),
        ThemeToken::TutorLabel => fg(Color::Cyan, &[Attribute::Bold]),
        ThemeToken::TutorText => fg(Color::White, &[]),
        ThemeToken::TutorWaiting => fg(Color::Yellow, &[Attribute::Bold]),
        ThemeToken::TutorError | ThemeToken::SystemError => {
            fg(Color::Red, &[Attribute::Bold, Attribute::Underlined])
        }
        ThemeToken::SystemInfo => fg(Color::Grey, &[]),
        ThemeToken::Banner => fg(Color::Yellow, &[Attribute::Bold, Attribute::Underlined]),
    }
}

fn fg(color: Color, attributes: &[Attribute]) -> ContentStyle {
    let mut style = ContentStyle::new();
    style.foreground_color = Some(color);
    for attribute in attributes {
        style.attributes.set(*attribute);
    }
    style
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

fn hex(color: HexColor) -> Color {
    rgb(color.r, color.g, color.b)
}

fn merge_style(base: ContentStyle, override_style: &StyleOverride) -> ContentStyle {
    let mut style = base;
    if let Some(color) = override_style.fg {
        style.foreground_color = Some(hex(color));
    }
    if let Some(color) = override_style.bg {
        style.background_color = Some(hex(color));
    }
    if let Some(modifiers) = &override_style.modifiers {
        style.attributes = Default::default();
        for modifier in modifiers {
            style.attributes.set(attribute_for(*modifier));
        }
    }
    style
}

fn attribute_for(modifier: ThemeModifier) -> Attribute {
    match modifier {
        ThemeModifier::Bold => Attribute::Bold,
        ThemeModifier::Dim => Attribute::Dim,
        ThemeModifier::Italic => Attribute::Italic,
        ThemeModifier::Underlined => Attribute::Underlined,
        ThemeModifier::Reversed => Attribute::Reverse,
        ThemeModifier::CrossedOut => Attribute::CrossedOut,
    }
}
