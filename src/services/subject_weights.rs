use std::collections::HashMap;

use once_cell::sync::Lazy;

const LEVEL_PREFIXES: [&str; 3] = ["TYT ", "AYT ", "LGS "];

/// Alias table keyed by the diacritic-folded spelling; exam-specific
/// naming variants share one weight-table entry through it.
static SUBJECT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Fen Bilimleri", "Fen"),
        ("Fen Bilimleri (Fen)", "Fen"),
        ("T.C. Inkilap Tarihi ve Ataturkculuk", "Tarih"),
        ("Din Kulturu ve Ahlak Bilgisi", "Din"),
        ("Sosyal Bilgiler", "Sosyal"),
        ("Sosyal Bilimler", "Sosyal"),
        ("Temel Matematik", "Matematik"),
    ])
});

fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Canonical form of a subject name: level prefix stripped, Turkish
/// diacritics folded, known aliases applied. `"TYT Türkçe"` and
/// `"Türkçe"` resolve to the same weight-table key.
pub fn canonical_subject(subject: &str) -> String {
    let mut result = subject.trim();

    for prefix in LEVEL_PREFIXES {
        // get() avoids slicing through a multi-byte character.
        let matches_prefix = result
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches_prefix {
            result = result[prefix.len()..].trim();
        }
    }

    let folded = fold_diacritics(result);
    match SUBJECT_ALIASES.get(folded.as_str()) {
        Some(alias) => (*alias).to_string(),
        None => folded,
    }
}

/// Historical per-topic question frequencies per canonical subject.
/// Consumed only by the weighted sampler; never written by scoring.
#[derive(Clone, Debug, Default)]
pub struct TopicWeightTable {
    weights: HashMap<String, HashMap<String, u32>>,
}

impl TopicWeightTable {
    pub fn from_entries(entries: &[(&str, &[(&str, u32)])]) -> Self {
        let mut weights = HashMap::new();
        for (subject, topics) in entries {
            let topic_weights: HashMap<String, u32> = topics
                .iter()
                .filter(|(_, weight)| *weight > 0)
                .map(|(topic, weight)| (topic.to_string(), *weight))
                .collect();
            if !topic_weights.is_empty() {
                weights.insert(canonical_subject(subject), topic_weights);
            }
        }
        Self { weights }
    }

    pub fn weights_for(&self, subject: &str) -> Option<&HashMap<String, u32>> {
        self.weights.get(&canonical_subject(subject))
    }
}

/// Built-in distribution derived from past TYT/AYT/LGS papers. Example
/// configuration data, not invariant curriculum rules.
pub static DEFAULT_TOPIC_WEIGHTS: Lazy<TopicWeightTable> = Lazy::new(|| {
    TopicWeightTable::from_entries(&[
        (
            "Matematik",
            &[
                ("Sayılar", 34),
                ("Denklemler", 22),
                ("Fonksiyonlar", 18),
                ("Problemler", 40),
                ("Olasılık", 12),
            ],
        ),
        (
            "Geometri",
            &[
                ("Üçgenler", 28),
                ("Çemberler", 16),
                ("Analitik Geometri", 14),
                ("Katı Cisimler", 10),
            ],
        ),
        (
            "Türkçe",
            &[
                ("Paragraf", 52),
                ("Sözcükte Anlam", 30),
                ("Cümlede Anlam", 26),
                ("Dil Bilgisi", 24),
            ],
        ),
        (
            "Fen",
            &[("Fizik", 24), ("Kimya", 22), ("Biyoloji", 20)],
        ),
        (
            "Sosyal",
            &[
                ("Tarih", 22),
                ("Coğrafya", 20),
                ("Felsefe", 12),
                ("Din Kültürü", 10),
            ],
        ),
        (
            "Edebiyat",
            &[
                ("Şiir Bilgisi", 18),
                ("Divan Edebiyatı", 16),
                ("Roman", 14),
                ("Halk Edebiyatı", 12),
            ],
        ),
        (
            "İngilizce",
            &[
                ("Okuma Anlama", 24),
                ("Kelime Bilgisi", 20),
                ("Dil Bilgisi", 16),
            ],
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_level_prefixes() {
        assert_eq!(canonical_subject("TYT Matematik"), "Matematik");
        assert_eq!(canonical_subject("AYT Edebiyat"), "Edebiyat");
        assert_eq!(canonical_subject("lgs Matematik"), "Matematik");
    }

    #[test]
    fn folds_turkish_diacritics() {
        assert_eq!(canonical_subject("Türkçe"), "Turkce");
        assert_eq!(canonical_subject("İngilizce"), "Ingilizce");
    }

    #[test]
    fn applies_alias_table() {
        assert_eq!(canonical_subject("Fen Bilimleri"), "Fen");
        assert_eq!(canonical_subject("TYT Sosyal Bilgiler"), "Sosyal");
        assert_eq!(
            canonical_subject("T.C. İnkılap Tarihi ve Atatürkçülük"),
            "Tarih"
        );
    }

    #[test]
    fn untouched_names_pass_through() {
        assert_eq!(canonical_subject("Geometri"), "Geometri");
        assert_eq!(canonical_subject("  Geometri  "), "Geometri");
    }

    #[test]
    fn variant_names_share_one_weight_entry() {
        let weights = DEFAULT_TOPIC_WEIGHTS
            .weights_for("TYT Türkçe")
            .expect("Türkçe weights exist");
        assert_eq!(weights.get("Paragraf"), Some(&52));

        let same = DEFAULT_TOPIC_WEIGHTS
            .weights_for("Türkçe")
            .expect("Türkçe weights exist");
        assert_eq!(weights.len(), same.len());
    }

    #[test]
    fn zero_weight_topics_are_dropped() {
        let table = TopicWeightTable::from_entries(&[("Deneme", &[("Boş", 0), ("Dolu", 3)])]);
        let weights = table.weights_for("Deneme").expect("subject exists");

        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get("Dolu"), Some(&3));
    }

    #[test]
    fn unknown_subject_has_no_weights() {
        assert!(DEFAULT_TOPIC_WEIGHTS.weights_for("Astronomi").is_none());
    }
}
