//! Non-destructive filter adjustments applied as a rendering transform.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Brightness,
    Contrast,
    Saturate,
    Grayscale,
    Sepia,
    Invert,
    HueRotate,
    Blur,
}

impl FilterField {
    /// Every field, in the order the compositor applies them.
    pub const ALL: [FilterField; 8] = [
        Self::Brightness,
        Self::Contrast,
        Self::Saturate,
        Self::Grayscale,
        Self::Sepia,
        Self::Invert,
        Self::HueRotate,
        Self::Blur,
    ];

    pub const fn range(self) -> (f32, f32) {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => (0.0, 200.0),
            Self::Grayscale | Self::Sepia | Self::Invert => (0.0, 100.0),
            Self::HueRotate => (0.0, 360.0),
            Self::Blur => (0.0, 10.0),
        }
    }

    pub const fn default_value(self) -> f32 {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => 100.0,
            Self::Grayscale
            | Self::Sepia
            | Self::Invert
            | Self::HueRotate
            | Self::Blur => 0.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturate => "Saturation",
            Self::Grayscale => "Grayscale",
            Self::Sepia => "Sepia",
            Self::Invert => "Invert",
            Self::HueRotate => "Hue",
            Self::Blur => "Blur",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::HueRotate => "deg",
            Self::Blur => "px",
            _ => "%",
        }
    }

    /// Clamps `value` into the field range; NaN falls back to the neutral value.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    pub brightness: f32,
    pub contrast: f32,
    pub saturate: f32,
    pub grayscale: f32,
    pub sepia: f32,
    pub invert: f32,
    pub hue_rotate: f32,
    pub blur: f32,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            brightness: FilterField::Brightness.default_value(),
            contrast: FilterField::Contrast.default_value(),
            saturate: FilterField::Saturate.default_value(),
            grayscale: FilterField::Grayscale.default_value(),
            sepia: FilterField::Sepia.default_value(),
            invert: FilterField::Invert.default_value(),
            hue_rotate: FilterField::HueRotate.default_value(),
            blur: FilterField::Blur.default_value(),
        }
    }
}

impl FilterSet {
    pub fn get(&self, field: FilterField) -> f32 {
        match field {
            FilterField::Brightness => self.brightness,
            FilterField::Contrast => self.contrast,
            FilterField::Saturate => self.saturate,
            FilterField::Grayscale => self.grayscale,
            FilterField::Sepia => self.sepia,
            FilterField::Invert => self.invert,
            FilterField::HueRotate => self.hue_rotate,
            FilterField::Blur => self.blur,
        }
    }

    fn slot_mut(&mut self, field: FilterField) -> &mut f32 {
        match field {
            FilterField::Brightness => &mut self.brightness,
            FilterField::Contrast => &mut self.contrast,
            FilterField::Saturate => &mut self.saturate,
            FilterField::Grayscale => &mut self.grayscale,
            FilterField::Sepia => &mut self.sepia,
            FilterField::Invert => &mut self.invert,
            FilterField::HueRotate => &mut self.hue_rotate,
            FilterField::Blur => &mut self.blur,
        }
    }

    /// Returns a copy with `field` set to the clamped `value`.
    pub fn with(mut self, field: FilterField, value: f32) -> Self {
        *self.slot_mut(field) = field.clamp(value);
        self
    }

    /// Re-clamps every field, used when a set arrives from outside (scripts, config).
    pub fn sanitized(self) -> Self {
        FilterField::ALL
            .into_iter()
            .fold(self, |set, field| set.with(field, set.get(field)))
    }

    pub fn is_neutral(&self, field: FilterField) -> bool {
        self.get(field) == field.default_value()
    }

    pub fn is_identity(&self) -> bool {
        FilterField::ALL.into_iter().all(|field| self.is_neutral(field))
    }
}

pub fn set_filter(filters: FilterSet, field: FilterField, value: f32) -> FilterSet {
    filters.with(field, value)
}

pub fn reset_filters() -> FilterSet {
    FilterSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral_and_inside_ranges() {
        let filters = reset_filters();
        assert!(filters.is_identity());
        for field in FilterField::ALL {
            let (min, max) = field.range();
            let value = filters.get(field);
            assert!(value >= min && value <= max, "{field:?} default out of range");
        }
        assert_eq!(filters.brightness, 100.0);
        assert_eq!(filters.hue_rotate, 0.0);
    }

    #[test]
    fn set_filter_clamps_out_of_range_values_to_boundaries() {
        for field in FilterField::ALL {
            let (min, max) = field.range();
            let high = set_filter(FilterSet::default(), field, max + 50.0);
            assert_eq!(high.get(field), max, "{field:?} should clamp high");
            let low = set_filter(FilterSet::default(), field, min - 50.0);
            assert_eq!(low.get(field), min, "{field:?} should clamp low");
        }
    }

    #[test]
    fn set_filter_keeps_in_range_value_and_other_fields() {
        let filters = set_filter(FilterSet::default(), FilterField::Sepia, 42.5);
        assert_eq!(filters.sepia, 42.5);
        assert_eq!(filters.brightness, 100.0);
        assert!(!filters.is_identity());
    }

    #[test]
    fn nan_and_infinite_inputs_never_escape_the_range() {
        let filters = set_filter(FilterSet::default(), FilterField::Contrast, f32::NAN);
        assert_eq!(filters.contrast, 100.0);
        let filters = set_filter(filters, FilterField::Blur, f32::INFINITY);
        assert_eq!(filters.blur, 10.0);
    }

    #[test]
    fn sanitized_clamps_externally_supplied_sets() {
        let raw = FilterSet {
            brightness: 250.0,
            hue_rotate: -10.0,
            ..FilterSet::default()
        };
        let clean = raw.sanitized();
        assert_eq!(clean.brightness, 200.0);
        assert_eq!(clean.hue_rotate, 0.0);
    }

    #[test]
    fn filter_set_deserializes_with_camel_case_and_missing_fields() {
        let parsed: FilterSet = serde_json::from_str(r#"{"hueRotate": 90, "blur": 2}"#)
            .expect("filter json should parse");
        assert_eq!(parsed.hue_rotate, 90.0);
        assert_eq!(parsed.blur, 2.0);
        assert_eq!(parsed.saturate, 100.0);
    }
}
