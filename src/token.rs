//! Tokens and the colour palette they are dealt from.

use crate::cluster::ClusterId;
use crate::error::BoardError;
use rand::Rng;
use std::fmt;

/// Token colours, in the order the terminal legend shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenColor {
    Purple,
    Cyan,
    Green,
    Yellow,
    Red,
}

impl TokenColor {
    pub const ALL: [Self; 5] = [
        Self::Purple,
        Self::Cyan,
        Self::Green,
        Self::Yellow,
        Self::Red,
    ];

    /// Index into a theme's token colour table (0..5).
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Purple => "Purple",
            Self::Cyan => "Cyan",
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Red => "Red",
        }
    }
}

impl fmt::Display for TokenColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-empty, duplicate-free set of colours a board is dealt from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<TokenColor>,
}

impl Palette {
    pub fn new(colors: impl IntoIterator<Item = TokenColor>) -> Result<Self, BoardError> {
        let mut unique = Vec::new();
        for color in colors {
            if !unique.contains(&color) {
                unique.push(color);
            }
        }
        if unique.is_empty() {
            return Err(BoardError::EmptyPalette);
        }
        Ok(Self { colors: unique })
    }

    /// The first `n` colours of [`TokenColor::ALL`]; `n` is clamped to 1..=5.
    pub fn first(n: usize) -> Self {
        let n = n.clamp(1, TokenColor::ALL.len());
        Self {
            colors: TokenColor::ALL[..n].to_vec(),
        }
    }

    pub fn colors(&self) -> &[TokenColor] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Uniformly random colour from this palette.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> TokenColor {
        self.colors[rng.random_range(0..self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::first(TokenColor::ALL.len())
    }
}

/// Serial number assigned when a token is dealt; survives compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u32);

/// A coloured occupant of one board cell.
///
/// `x`/`y` mirror the token's position in the board matrix and are refreshed by
/// [`Token::relocate`] after every compaction. `cluster` is `None` only while
/// clusters are being recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    id: TokenId,
    color: TokenColor,
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) cluster: Option<ClusterId>,
}

impl Token {
    pub const fn new(id: TokenId, color: TokenColor, x: usize, y: usize) -> Self {
        Self {
            id,
            color,
            x,
            y,
            cluster: None,
        }
    }

    #[inline]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    #[inline]
    pub const fn color(&self) -> TokenColor {
        self.color
    }

    #[inline]
    pub const fn x(&self) -> usize {
        self.x
    }

    #[inline]
    pub const fn y(&self) -> usize {
        self.y
    }

    #[inline]
    pub const fn cluster(&self) -> Option<ClusterId> {
        self.cluster
    }

    pub fn relocate(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_palette_rejects_empty() {
        assert_eq!(Palette::new(Vec::<TokenColor>::new()).unwrap_err(), BoardError::EmptyPalette);
    }

    #[test]
    fn test_palette_dedups_in_order() {
        let p = Palette::new([TokenColor::Red, TokenColor::Cyan, TokenColor::Red]).unwrap();
        assert_eq!(p.colors(), &[TokenColor::Red, TokenColor::Cyan]);
    }

    #[test]
    fn test_palette_first_clamps() {
        assert_eq!(Palette::first(0).len(), 1);
        assert_eq!(Palette::first(3).colors(), &TokenColor::ALL[..3]);
        assert_eq!(Palette::first(99), Palette::default());
    }

    #[test]
    fn test_pick_stays_in_palette() {
        let p = Palette::new([TokenColor::Green, TokenColor::Yellow]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(p.colors().contains(&p.pick(&mut rng)));
        }
    }

    #[test]
    fn test_relocate_keeps_identity_and_colour() {
        let mut t = Token::new(TokenId(4), TokenColor::Cyan, 3, 2);
        t.relocate(1, 0);
        assert_eq!((t.x(), t.y()), (1, 0));
        assert_eq!(t.id(), TokenId(4));
        assert_eq!(t.color(), TokenColor::Cyan);
        assert_eq!(t.cluster(), None);
    }
}
