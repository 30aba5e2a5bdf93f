//! Property-size classification by fiscal-module bands.
//!
//! A parcel is sized relative to the fiscal module of its municipality, a
//! regionally defined reference area in hectares. The bands partition the
//! positive ratio line: anything that falls outside them (zero or negative
//! area, zero module, NaN) is left unclassified.

/// One of the five mutually exclusive property-size categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    SmallBelowOneModule,
    Small,
    Medium,
    Large,
    Unclassified,
}

impl Category {
    /// Display label, shared verbatim with the remote pipeline.
    pub fn label(self) -> &'static str {
        match self {
            Category::SmallBelowOneModule => "Small Property < 1 Fiscal Module",
            Category::Small => "Small Property",
            Category::Medium => "Medium Property",
            Category::Large => "Large Property",
            Category::Unclassified => "Unclassified",
        }
    }

    /// Fill color used by the map overlay. Must stay identical to the
    /// mapping applied to server-classified data.
    pub fn color(self) -> &'static str {
        match self {
            Category::SmallBelowOneModule => "#9b19f5",
            Category::Small => "#0040bf",
            Category::Medium => "#e6d800",
            Category::Large => "#d97f00",
            Category::Unclassified => "#808080",
        }
    }

    pub const ALL: [Category; 5] = [
        Category::SmallBelowOneModule,
        Category::Small,
        Category::Medium,
        Category::Large,
        Category::Unclassified,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a parcel from its area and the local fiscal module, both in
/// hectares.
///
/// Band boundaries are closed on the upper end: `area == modulo_fiscal`
/// is already `Small`, `area == 4 * modulo_fiscal` still is, and
/// `area == 15 * modulo_fiscal` is still `Medium`. The arms are ordered,
/// so a later band can never reclaim a ratio an earlier band matched.
pub fn classify(area: f64, modulo_fiscal: f64) -> Category {
    if !area.is_finite() || !modulo_fiscal.is_finite() {
        return Category::Unclassified;
    }
    if area > 0.0 && area < modulo_fiscal {
        Category::SmallBelowOneModule
    } else if modulo_fiscal > 0.0 && area >= modulo_fiscal && area <= 4.0 * modulo_fiscal {
        Category::Small
    } else if modulo_fiscal > 0.0 && area > 4.0 * modulo_fiscal && area <= 15.0 * modulo_fiscal {
        Category::Medium
    } else if modulo_fiscal > 0.0 && area > 15.0 * modulo_fiscal {
        Category::Large
    } else {
        Category::Unclassified
    }
}
