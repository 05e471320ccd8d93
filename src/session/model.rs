use crate::geometry::Orientation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Portrait,
    Landscape,
    Review,
}

impl Stage {
    /// Orientation edited in this stage; `None` for review.
    pub const fn orientation(self) -> Option<Orientation> {
        match self {
            Self::Portrait => Some(Orientation::Portrait),
            Self::Landscape => Some(Orientation::Landscape),
            Self::Review => None,
        }
    }

    pub const fn step(self) -> u8 {
        match self {
            Self::Portrait => 1,
            Self::Landscape => 2,
            Self::Review => 3,
        }
    }
}
