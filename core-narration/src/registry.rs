//! # Audio Asset Registry
//!
//! Static mapping from a narration key to its audio source, transcript and
//! optional word timings. The catalog is built once and never mutated while a
//! service is using it.

use crate::error::NarrationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Keys
// ============================================================================

/// Identifier of one narration clip.
///
/// The set is closed and known at build time. Serialized names match the
/// identifiers used by the web front-end (`"temperatureTopic"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioKey {
    MainScreenWelcome,
    TemperatureTopic,
    CompositionTopic,
    NeighborsTopic,
    QuizQuestion,
    QuizCorrect,
    QuizWrong,
    Credits,
}

impl AudioKey {
    /// Every key, in presentation order.
    pub const ALL: [AudioKey; 8] = [
        AudioKey::MainScreenWelcome,
        AudioKey::TemperatureTopic,
        AudioKey::CompositionTopic,
        AudioKey::NeighborsTopic,
        AudioKey::QuizQuestion,
        AudioKey::QuizCorrect,
        AudioKey::QuizWrong,
        AudioKey::Credits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioKey::MainScreenWelcome => "mainScreenWelcome",
            AudioKey::TemperatureTopic => "temperatureTopic",
            AudioKey::CompositionTopic => "compositionTopic",
            AudioKey::NeighborsTopic => "neighborsTopic",
            AudioKey::QuizQuestion => "quizQuestion",
            AudioKey::QuizCorrect => "quizCorrect",
            AudioKey::QuizWrong => "quizWrong",
            AudioKey::Credits => "credits",
        }
    }
}

impl fmt::Display for AudioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioKey {
    type Err = NarrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AudioKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| NarrationError::UnknownKey(s.to_string()))
    }
}

// ============================================================================
// Assets
// ============================================================================

/// When a word or phrase is spoken, in seconds from the start of the clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// The word has begun by time `t`.
    pub fn has_started(&self, t: f64) -> bool {
        self.start <= t
    }

    /// The word is being spoken at time `t` (`start <= t < end`).
    pub fn is_active(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Where a clip's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Path relative to the host's asset root, or an absolute `http(s)` URL.
    File(String),
    /// No recording exists yet; only the transcript is known.
    Placeholder,
}

impl AssetSource {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, AssetSource::Placeholder)
    }
}

/// One playable narration unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationAsset {
    pub key: AudioKey,
    pub source: AssetSource,
    /// Full text, shown verbatim when no timings are available.
    pub transcript: String,
    pub word_timings: Vec<WordTiming>,
}

impl NarrationAsset {
    /// A recorded clip at `path`.
    pub fn recorded(key: AudioKey, path: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            key,
            source: AssetSource::File(path.into()),
            transcript: transcript.into(),
            word_timings: Vec::new(),
        }
    }

    /// A transcript without audio.
    pub fn placeholder(key: AudioKey, transcript: impl Into<String>) -> Self {
        Self {
            key,
            source: AssetSource::Placeholder,
            transcript: transcript.into(),
            word_timings: Vec::new(),
        }
    }

    pub fn with_timings(mut self, timings: Vec<WordTiming>) -> Self {
        self.word_timings = timings;
        self
    }

    pub fn is_recorded(&self) -> bool {
        !self.source.is_placeholder()
    }

    /// Starts never decrease and every entry has `end > start`.
    pub fn timings_are_well_formed(&self) -> bool {
        self.word_timings.iter().all(|t| t.end > t.start)
            && self
                .word_timings
                .windows(2)
                .all(|pair| pair[0].start <= pair[1].start)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Key → asset table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    assets: BTreeMap<AudioKey, NarrationAsset>,
}

impl Catalog {
    /// An empty catalog. Every key resolves to [`NarrationError::AssetUnavailable`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The narration shipped with the application.
    ///
    /// Two clips are recorded; the rest are placeholders that only carry the
    /// script.
    pub fn builtin() -> Self {
        Self::new()
            .with_asset(
                NarrationAsset::recorded(
                    AudioKey::MainScreenWelcome,
                    "./public/audio-1.wav",
                    "Olá! Eu sou o Sol, a estrela que ilumina o seu dia. Toque nos tópicos ao meu \
                     redor para descobrir os segredos da minha luz!",
                )
                .with_timings(welcome_timings()),
            )
            .with_asset(NarrationAsset::recorded(
                AudioKey::TemperatureTopic,
                "./public/audio-2.wav",
                "Assim como a chama azul de um fogão é mais quente que a amarela, a minha cor \
                 amarelada me coloca em uma temperatura de cerca de cinco mil e quinhentos graus \
                 Celsius!",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::CompositionTopic,
                "Quando minha luz passa por um prisma, ela mostra um arco-íris com linhas escuras. \
                 Essas linhas são as impressões digitais dos elementos químicos que me formam. Sou \
                 feito principalmente de Hidrogênio e Hélio. Curiosidade: o Hélio foi descoberto \
                 em mim antes de ser encontrado na Terra!",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::NeighborsTopic,
                "A minha luz viaja pelo espaço e atravessa a atmosfera dos planetas. Os gases de \
                 cada planeta roubam algumas cores da minha luz. Analisando as cores que faltam, \
                 os cientistas descobrem do que são feitas as atmosferas dos meus vizinhos! É \
                 como se cada planeta deixasse sua assinatura na minha luz.",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::QuizQuestion,
                "Vamos testar seus conhecimentos! Esta impressão digital de luz, rica em Metano, \
                 pertence a qual gigante gasoso?",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::QuizCorrect,
                "Correto! A atmosfera azul de Netuno é rica em Metano, que absorve fortemente a \
                 luz vermelha, criando essas impressões escuras no espectro.",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::QuizWrong,
                "Quase! A resposta correta é Netuno. A atmosfera de Netuno é rica em Metano.",
            ))
            .with_asset(NarrationAsset::placeholder(
                AudioKey::Credits,
                "Obrigado por explorar os segredos da minha luz! Continue curioso e sempre olhe \
                 para as estrelas. Até a próxima aventura!",
            ))
    }

    /// Add or replace the entry for `asset.key`.
    pub fn with_asset(mut self, asset: NarrationAsset) -> Self {
        self.insert(asset);
        self
    }

    pub fn insert(&mut self, asset: NarrationAsset) {
        self.assets.insert(asset.key, asset);
    }

    pub fn get(&self, key: AudioKey) -> Option<&NarrationAsset> {
        self.assets.get(&key)
    }

    /// Keys that have real audio behind them.
    pub fn recorded_keys(&self) -> Vec<AudioKey> {
        self.assets
            .values()
            .filter(|asset| asset.is_recorded())
            .map(|asset| asset.key)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NarrationAsset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn welcome_timings() -> Vec<WordTiming> {
    [
        ("Olá!", 0.0, 0.6),
        ("Eu", 0.8, 0.95),
        ("sou", 0.95, 1.2),
        ("o", 1.2, 1.3),
        ("Sol,", 1.3, 1.8),
        ("a", 2.0, 2.1),
        ("estrela", 2.1, 2.6),
        ("que", 2.6, 2.75),
        ("ilumina", 2.75, 3.3),
        ("o", 3.3, 3.4),
        ("seu", 3.4, 3.6),
        ("dia.", 3.6, 4.1),
        ("Toque", 4.5, 4.85),
        ("nos", 4.85, 5.05),
        ("tópicos", 5.05, 5.55),
        ("ao", 5.55, 5.7),
        ("meu", 5.7, 5.9),
        ("redor", 5.9, 6.35),
        ("para", 6.5, 6.7),
        ("descobrir", 6.7, 7.25),
        ("os", 7.25, 7.35),
        ("segredos", 7.35, 7.9),
        ("da", 7.9, 8.0),
        ("minha", 8.0, 8.3),
        ("luz!", 8.3, 8.9),
    ]
    .into_iter()
    .map(|(text, start, end)| WordTiming::new(text, start, end))
    .collect()
}
