//! WNdb flat-file parsing and in-memory lookup structures.
//!
//! The loader reads the four `index.*` / `data.*` pairs plus the `*.exc`
//! exception lists. Offsets act as opaque synset ids scoped to their data
//! file; adjective satellites (`ss_type = s`) live in `data.adj` but keep
//! their own POS character so offset ids round-trip exactly.

use std::fs;
use std::path::Path;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::WordNetError;

/// Part of speech, matching the WNdb `ss_type` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pos {
    Noun,
    Verb,
    Adj,
    AdjSat,
    Adv,
}

impl Pos {
    pub fn as_char(self) -> char {
        match self {
            Pos::Noun => 'n',
            Pos::Verb => 'v',
            Pos::Adj => 'a',
            Pos::AdjSat => 's',
            Pos::Adv => 'r',
        }
    }

    pub fn from_char(c: char) -> Option<Pos> {
        match c {
            'n' => Some(Pos::Noun),
            'v' => Some(Pos::Verb),
            'a' => Some(Pos::Adj),
            's' => Some(Pos::AdjSat),
            'r' => Some(Pos::Adv),
            _ => None,
        }
    }

    /// The data file this POS is stored in. Satellites share `data.adj`.
    pub(crate) fn file(self) -> FileKind {
        match self {
            Pos::Noun => FileKind::Noun,
            Pos::Verb => FileKind::Verb,
            Pos::Adj | Pos::AdjSat => FileKind::Adj,
            Pos::Adv => FileKind::Adv,
        }
    }
}

/// One of the four WNdb data/index file pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FileKind {
    Noun,
    Verb,
    Adj,
    Adv,
}

impl FileKind {
    pub(crate) const ALL: [FileKind; 4] =
        [FileKind::Noun, FileKind::Verb, FileKind::Adj, FileKind::Adv];

    fn suffix(self) -> &'static str {
        match self {
            FileKind::Noun => "noun",
            FileKind::Verb => "verb",
            FileKind::Adj => "adj",
            FileKind::Adv => "adv",
        }
    }

    fn from_pos_char(c: char) -> Option<FileKind> {
        Pos::from_char(c).map(Pos::file)
    }
}

/// Stable reference to a synset: data file + offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynsetKey {
    pub(crate) file: FileKind,
    pub(crate) offset: u32,
}

/// A single synset: lemmas, gloss, and hierarchy pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct Synset {
    pub(crate) file: FileKind,
    pub offset: u32,
    pub pos: Pos,
    /// Lemma surface forms, lowercased with underscores replaced by spaces.
    pub lemmas: Vec<String>,
    pub gloss: String,
    pub(crate) hypernyms: Vec<SynsetKey>,
    pub(crate) hyponyms: Vec<SynsetKey>,
}

impl Synset {
    pub(crate) fn key(&self) -> SynsetKey {
        SynsetKey {
            file: self.file,
            offset: self.offset,
        }
    }

    /// The canonical id: zero-padded offset plus POS character, e.g. `"02958343-n"`.
    pub fn offset_id(&self) -> String {
        format!("{:08}-{}", self.offset, self.pos.as_char())
    }

    /// Preferred surface form (first lemma), or `""` for a malformed synset.
    pub fn first_lemma(&self) -> &str {
        self.lemmas.first().map(String::as_str).unwrap_or("")
    }
}

/// In-memory WordNet database.
pub struct WordNet {
    pub(crate) synsets: FxHashMap<SynsetKey, Synset>,
    /// lemma (underscored, lowercase) → synset keys in index-file order,
    /// nouns first, then verbs, adjectives, adverbs.
    pub(crate) index: FxHashMap<String, Vec<SynsetKey>>,
    pub(crate) exceptions: FxHashMap<(FileKind, String), String>,
    available: bool,
}

impl WordNet {
    /// An empty, unavailable database: every lookup returns nothing.
    pub fn empty() -> Self {
        WordNet {
            synsets: FxHashMap::default(),
            index: FxHashMap::default(),
            exceptions: FxHashMap::default(),
            available: false,
        }
    }

    /// Load a WNdb `dict/` directory. Missing individual files are tolerated
    /// (an adjective-only fixture is a valid database); a directory with no
    /// readable index at all is an error.
    pub fn load(dir: &Path) -> Result<Self, WordNetError> {
        let mut db = WordNet {
            synsets: FxHashMap::default(),
            index: FxHashMap::default(),
            exceptions: FxHashMap::default(),
            available: false,
        };

        let mut loaded_any = false;
        for file in FileKind::ALL {
            let data_path = dir.join(format!("data.{}", file.suffix()));
            let index_path = dir.join(format!("index.{}", file.suffix()));
            if !data_path.exists() || !index_path.exists() {
                continue;
            }

            let data = fs::read_to_string(&data_path)?;
            for line in data.lines() {
                if line.starts_with("  ") || line.trim().is_empty() {
                    continue; // license header
                }
                match parse_data_line(line, file) {
                    Some(synset) => {
                        db.synsets.insert(synset.key(), synset);
                    }
                    None => {
                        tracing::debug!(file = file.suffix(), "skipping unparseable data line");
                    }
                }
            }

            let index = fs::read_to_string(&index_path)?;
            for line in index.lines() {
                if line.starts_with("  ") || line.trim().is_empty() {
                    continue;
                }
                if let Some((lemma, keys)) = parse_index_line(line) {
                    db.index.entry(lemma).or_default().extend(keys);
                }
            }

            let exc_path = dir.join(format!("{}.exc", file.suffix()));
            if let Ok(exc) = fs::read_to_string(&exc_path) {
                for line in exc.lines() {
                    let mut parts = line.split_whitespace();
                    if let (Some(inflected), Some(base)) = (parts.next(), parts.next()) {
                        db.exceptions
                            .insert((file, inflected.to_lowercase()), base.to_lowercase());
                    }
                }
            }

            loaded_any = true;
        }

        if !loaded_any {
            return Err(WordNetError::Parse(format!(
                "no index/data file pairs found under {}",
                dir.display()
            )));
        }

        db.available = true;
        tracing::debug!(
            synsets = db.synsets.len(),
            lemmas = db.index.len(),
            "wordnet database loaded"
        );
        Ok(db)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn lookup_key(term: &str) -> String {
        term.trim().to_lowercase().replace(' ', "_")
    }

    /// All synsets for a term, nouns first (index-file order within a POS).
    pub fn synsets(&self, term: &str) -> Vec<&Synset> {
        self.index
            .get(&Self::lookup_key(term))
            .map(|keys| keys.iter().filter_map(|k| self.synsets.get(k)).collect())
            .unwrap_or_default()
    }

    /// Synsets for a term restricted to one part of speech (satellites count
    /// as adjectives).
    pub fn synsets_pos(&self, term: &str, pos: Pos) -> Vec<&Synset> {
        self.synsets(term)
            .into_iter()
            .filter(|s| s.pos.file() == pos.file())
            .collect()
    }

    /// Resolve an offset id like `"02958343-n"` back to its synset.
    pub fn synset_by_id(&self, id: &str) -> Option<&Synset> {
        let (offset_str, pos_str) = id.split_once('-')?;
        let offset: u32 = offset_str.parse().ok()?;
        let pos = Pos::from_char(pos_str.chars().next()?)?;
        self.synsets.get(&SynsetKey {
            file: pos.file(),
            offset,
        })
    }

    pub fn hypernyms_of(&self, synset: &Synset) -> Vec<&Synset> {
        synset
            .hypernyms
            .iter()
            .filter_map(|k| self.synsets.get(k))
            .collect()
    }

    pub fn hyponyms_of(&self, synset: &Synset) -> Vec<&Synset> {
        synset
            .hyponyms
            .iter()
            .filter_map(|k| self.synsets.get(k))
            .collect()
    }

    /// Whether a lemma exists under the given data file. Used by morphy.
    pub(crate) fn lemma_in_index(&self, lemma: &str, file: FileKind) -> bool {
        self.index
            .get(lemma)
            .map(|keys| keys.iter().any(|k| k.file == file))
            .unwrap_or(false)
    }
}

fn parse_data_line(line: &str, file: FileKind) -> Option<Synset> {
    let (head, gloss) = match line.split_once('|') {
        Some((h, g)) => (h, g.trim().to_string()),
        None => (line, String::new()),
    };

    let mut tokens = head.split_whitespace();
    let offset: u32 = tokens.next()?.parse().ok()?;
    let _lex_filenum = tokens.next()?;
    let pos = Pos::from_char(tokens.next()?.chars().next()?)?;

    let w_cnt = usize::from_str_radix(tokens.next()?, 16).ok()?;
    let mut lemmas = Vec::with_capacity(w_cnt);
    for _ in 0..w_cnt {
        let word = tokens.next()?;
        let _lex_id = tokens.next()?;
        lemmas.push(word.replace('_', " ").to_lowercase());
    }

    let p_cnt: usize = tokens.next()?.parse().ok()?;
    let mut hypernyms = Vec::new();
    let mut hyponyms = Vec::new();
    for _ in 0..p_cnt {
        let symbol = tokens.next()?;
        let target_offset: u32 = tokens.next()?.parse().ok()?;
        let target_file = FileKind::from_pos_char(tokens.next()?.chars().next()?)?;
        let _source_target = tokens.next()?;

        let key = SynsetKey {
            file: target_file,
            offset: target_offset,
        };
        match symbol {
            "@" | "@i" => hypernyms.push(key),
            "~" | "~i" => hyponyms.push(key),
            _ => {}
        }
    }
    // Verb frames (f_cnt section) may follow; they are irrelevant here.

    Some(Synset {
        file,
        offset,
        pos,
        lemmas,
        gloss,
        hypernyms,
        hyponyms,
    })
}

fn parse_index_line(line: &str) -> Option<(String, Vec<SynsetKey>)> {
    let mut tokens = line.split_whitespace();
    let lemma = tokens.next()?.to_lowercase();
    let file = FileKind::from_pos_char(tokens.next()?.chars().next()?)?;
    let synset_cnt: usize = tokens.next()?.parse().ok()?;
    let p_cnt: usize = tokens.next()?.parse().ok()?;
    for _ in 0..p_cnt {
        tokens.next()?;
    }
    let _sense_cnt = tokens.next()?;
    let _tagsense_cnt = tokens.next()?;

    let mut keys = Vec::with_capacity(synset_cnt);
    for _ in 0..synset_cnt {
        let offset: u32 = tokens.next()?.parse().ok()?;
        keys.push(SynsetKey { file, offset });
    }
    Some((lemma, keys))
}
