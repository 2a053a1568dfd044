use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Session lengths offered on the setup screen, in minutes.
pub const DURATION_OPTIONS: [u32; 5] = [10, 20, 30, 45, 60];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MeditationType {
    Mindfulness,
    Breathing,
    LovingKindness,
}

/// Which tone graph topology backs a meditation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AudioProfileKind {
    Bell,
    Ocean,
    Chimes,
}

#[derive(Debug)]
pub struct MeditationTypeProfile {
    pub kind: MeditationType,
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
    pub sound_name: &'static str,
    pub guide: [&'static str; 5],
    pub audio: AudioProfileKind,
}

static PROFILES: [MeditationTypeProfile; 3] = [
    MeditationTypeProfile {
        kind: MeditationType::Mindfulness,
        name: "Mindfulness",
        color: "#3b82f6",
        description: "Focus on present moment awareness",
        sound_name: "Generated Meditation Tone",
        guide: [
            "Find a quiet, comfortable space where you won't be disturbed",
            "Sit with your back straight but relaxed, or lie down if preferred",
            "Close your eyes gently and take three deep breaths to center yourself",
            "Begin to notice your natural breathing rhythm without changing it",
            "When thoughts arise, acknowledge them without judgment and return to your breath",
        ],
        audio: AudioProfileKind::Bell,
    },
    MeditationTypeProfile {
        kind: MeditationType::Breathing,
        name: "Breathing",
        color: "#10b981",
        description: "Controlled breathing exercises",
        sound_name: "Generated Ocean Waves",
        guide: [
            "Sit comfortably with your spine straight and shoulders relaxed",
            "Place one hand on your chest and one on your belly",
            "Breathe in slowly through your nose for 4 counts",
            "Hold your breath gently for 4 counts",
            "Exhale slowly through your mouth for 6 counts, feeling tension release",
        ],
        audio: AudioProfileKind::Ocean,
    },
    MeditationTypeProfile {
        kind: MeditationType::LovingKindness,
        name: "Loving Kindness",
        color: "#8b5cf6",
        description: "Compassion and loving-kindness meditation",
        sound_name: "Generated Chimes",
        guide: [
            "Sit comfortably and close your eyes with a gentle smile",
            "Begin by sending loving-kindness to yourself",
            "Think of someone you love deeply and send them warm wishes",
            "Think of someone neutral and extend compassion to them",
            "Finally, send loving-kindness to all beings everywhere",
        ],
        audio: AudioProfileKind::Chimes,
    },
];

impl MeditationType {
    pub const ALL: [MeditationType; 3] = [
        MeditationType::Mindfulness,
        MeditationType::Breathing,
        MeditationType::LovingKindness,
    ];

    pub fn profile(&self) -> &'static MeditationTypeProfile {
        match self {
            MeditationType::Mindfulness => &PROFILES[0],
            MeditationType::Breathing => &PROFILES[1],
            MeditationType::LovingKindness => &PROFILES[2],
        }
    }

    pub fn audio_profile(&self) -> AudioProfileKind {
        self.profile().audio
    }

    /// Parse the stored identifier (`mindfulness`, `breathing`, `loving_kindness`).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.to_string() == id)
    }

    pub fn next(&self) -> Self {
        match self {
            MeditationType::Mindfulness => MeditationType::Breathing,
            MeditationType::Breathing => MeditationType::LovingKindness,
            MeditationType::LovingKindness => MeditationType::Mindfulness,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            MeditationType::Mindfulness => MeditationType::LovingKindness,
            MeditationType::Breathing => MeditationType::Mindfulness,
            MeditationType::LovingKindness => MeditationType::Breathing,
        }
    }
}

/// Step to the neighbouring duration option, wrapping at either end.
pub fn cycle_duration(current: u32, forward: bool) -> u32 {
    let idx = DURATION_OPTIONS
        .iter()
        .position(|&d| d == current)
        .unwrap_or(0);
    let len = DURATION_OPTIONS.len();
    let next = if forward {
        (idx + 1) % len
    } else {
        (idx + len - 1) % len
    };
    DURATION_OPTIONS[next]
}
