use serde::Serialize;
use std::fmt;

/// Number of scores the classifier emits, one per [`ClassLabel`].
pub const NUM_CLASSES: usize = 5;

/// Classes in the order of the model's output scores.
pub const CLASS_LABELS: [ClassLabel; NUM_CLASSES] = [
    ClassLabel::Drawings,
    ClassLabel::Hentai,
    ClassLabel::Neutral,
    ClassLabel::Porn,
    ClassLabel::Sexy,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Drawings,
    Hentai,
    Neutral,
    Porn,
    Sexy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Safe,
    #[serde(rename = "NSFW")]
    Nsfw,
}

impl ClassLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Drawings => "drawings",
            ClassLabel::Hentai => "hentai",
            ClassLabel::Neutral => "neutral",
            ClassLabel::Porn => "porn",
            ClassLabel::Sexy => "sexy",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ClassLabel::Drawings | ClassLabel::Neutral => Category::Safe,
            ClassLabel::Hentai | ClassLabel::Porn | ClassLabel::Sexy => Category::Nsfw,
        }
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safe => "Safe",
            Category::Nsfw => "NSFW",
        }
    }
}

impl TryFrom<usize> for ClassLabel {
    type Error = String;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        CLASS_LABELS
            .get(index)
            .copied()
            .ok_or_else(|| format!("Invalid class index: {}", index))
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
