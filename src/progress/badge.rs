#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandOrder {
    /// Bands checked lowest threshold first; `percentage <= threshold` matches.
    InclusiveAscending,
    /// Bands checked highest threshold first; `percentage > threshold` matches.
    StrictDescending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub threshold: u32,
    pub label: String,
}

/// Ordered `(threshold, label)` ladder mapping a completion percentage to a
/// badge. `fallback` is the label when no band matches: the top tier for
/// ascending ladders, the bottom tier for descending ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgePolicy {
    order: BandOrder,
    bands: Vec<Band>,
    fallback: String,
}

impl BadgePolicy {
    pub fn new(order: BandOrder, mut bands: Vec<Band>, fallback: impl Into<String>) -> Self {
        match order {
            BandOrder::InclusiveAscending => bands.sort_by_key(|b| b.threshold),
            BandOrder::StrictDescending => {
                bands.sort_by_key(|b| std::cmp::Reverse(b.threshold))
            }
        }
        Self {
            order,
            bands,
            fallback: fallback.into(),
        }
    }

    /// Dashboard ladder: >80 / >60 / >40 / >20 / else.
    pub fn strict() -> Self {
        Self::new(
            BandOrder::StrictDescending,
            vec![
                band(80, "Master"),
                band(60, "Expert"),
                band(40, "Achiever"),
                band(20, "Explorer"),
            ],
            "Novice",
        )
    }

    /// Older course-card ladder: <=20 / <=40 / <=60 / <=80 / else.
    pub fn inclusive() -> Self {
        Self::new(
            BandOrder::InclusiveAscending,
            vec![
                band(20, "Beginner"),
                band(40, "Learner"),
                band(60, "Scholar"),
                band(80, "Expert"),
            ],
            "Master",
        )
    }

    pub fn order(&self) -> BandOrder {
        self.order
    }

    pub fn classify(&self, percentage: u32) -> &str {
        let matched = self.bands.iter().find(|b| match self.order {
            BandOrder::InclusiveAscending => percentage <= b.threshold,
            BandOrder::StrictDescending => percentage > b.threshold,
        });

        matched.map_or(self.fallback.as_str(), |b| b.label.as_str())
    }
}

impl Default for BadgePolicy {
    fn default() -> Self {
        Self::strict()
    }
}

fn band(threshold: u32, label: &str) -> Band {
    Band {
        threshold,
        label: label.to_string(),
    }
}
