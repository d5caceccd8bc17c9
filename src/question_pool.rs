use std::collections::{BTreeMap, BTreeSet};

use rand::{seq::SliceRandom, thread_rng};

use crate::{
    normalizer,
    question::{Question, RawQuestion, SourceOrigin},
};

/// Partition used when a requested field key is unknown.
pub const FALLBACK_FIELD: &str = "genel";
/// Subject bucket for questions carrying no tag of their own.
pub const UNGROUPED_SUBJECT: &str = "genel";

/// The curated corpus shipped with the crate, keyed by exam field. Records
/// deliberately use the historical raw shapes so they exercise the same
/// normalization path as every external source.
const BUILTIN_BANK: &str = r#"{
  "sayisal": [
    {"q": "2x + 6 = 18 denkleminde x kaçtır?", "o": ["4", "6", "8", "12"], "answer": "B) 6", "subject": "matematik", "difficulty": "kolay"},
    {"q": "Dik kenarları 3 cm ve 4 cm olan dik üçgenin hipotenüsü kaç cm'dir?", "o": ["5", "6", "7", "12"], "answer": "5", "subject": "matematik", "difficulty": "orta"},
    {"question": "120 sayısının %25'i kaçtır?", "options": ["20", "25", "30", "40"], "answerIndex": 2, "subject": "matematik", "difficulty": "kolay"},
    {"question": "Ardışık üç çift sayının toplamı 36 ise en büyüğü kaçtır?", "options": ["10", "12", "14", "16"], "answerIndex": 2, "subject": "matematik", "difficulty": "orta"},
    {"q": "Saf su deniz seviyesinde kaç derecede kaynar?", "o": ["50", "90", "100", "120"], "answer": "C", "subject": "fizik", "difficulty": "kolay"},
    {"q": "Hızın SI birimi nedir?", "o": ["km/sa", "m/s", "m/s²", "N"], "answer": "m/s", "subject": "fizik", "difficulty": "kolay"},
    {"text": "Ses aşağıdaki ortamların hangisinde yayılmaz?", "choices": ["Hava", "Su", "Demir", "Boşluk"], "answer": "D) Boşluk", "subject": "fizik", "difficulty": "orta"},
    {"q": "Suyun kimyasal formülü nedir?", "o": ["CO2", "H2O", "NaCl", "O2"], "answer": "B", "subject": "kimya", "difficulty": "kolay"},
    {"question": "Periyodik tabloda 'Fe' simgesi hangi elementi gösterir?", "options": ["Flor", "Fosfor", "Demir", "Fermiyum"], "answer": "Demir", "subject": "kimya", "difficulty": "orta"},
    {"q": "Hücrede enerji üretiminden sorumlu organel hangisidir?", "o": ["Ribozom", "Mitokondri", "Lizozom", "Koful"], "answer": "B) Mitokondri", "subject": "biyoloji", "difficulty": "orta"}
  ],
  "sozel": [
    {"q": "'Kitaplıktaki romanları dün akşam kardeşim düzenledi.' cümlesinin öznesi hangisidir?", "o": ["romanları", "dün akşam", "kardeşim", "düzenledi"], "answer": "C", "subject": "turkce", "difficulty": "orta"},
    {"question": "Aşağıdaki kelimelerden hangisi türemiş bir sözcüktür?", "options": ["Göz", "Gözlük", "Kapı", "Yol"], "answerIndex": 1, "subject": "turkce", "difficulty": "orta"},
    {"q": "İstanbul hangi yıl fethedilmiştir?", "o": ["1453", "1071", "1923", "1517"], "answer": "1453", "subject": "tarih", "difficulty": "kolay"},
    {"text": "Cumhuriyet hangi yıl ilan edilmiştir?", "choices": ["1919", "1920", "1922", "1923"], "answer": "D) 1923", "subject": "tarih", "difficulty": "kolay"},
    {"q": "Türkiye'nin en uzun nehri hangisidir?", "o": ["Sakarya", "Kızılırmak", "Fırat", "Yeşilırmak"], "answer": "B", "subject": "cografya", "difficulty": "orta"},
    {"question": "Dünyanın en büyük okyanusu hangisidir?", "options": ["Atlas", "Hint", "Büyük Okyanus", "Kuzey Buz"], "answer": "Büyük Okyanus", "subject": "cografya", "difficulty": "kolay"}
  ],
  "genel": [
    {"q": "Bir yıl kaç haftadan oluşur?", "o": ["48", "50", "52", "54"], "answer": "52", "difficulty": "kolay"},
    {"q": "Türkiye'nin başkenti neresidir?", "o": ["İstanbul", "Ankara", "İzmir", "Bursa"], "answer": "B) Ankara", "difficulty": "kolay"},
    {"question": "Bir düzine kaç adettir?", "options": ["6", "10", "12", "24"], "answerIndex": 2, "difficulty": "kolay"},
    {"q": "Güneş sistemindeki en büyük gezegen hangisidir?", "o": ["Mars", "Venüs", "Satürn", "Jüpiter"], "answer": "D", "difficulty": "orta"}
  ]
}"#;

/// Field-partitioned corpus of canonical questions. Sampling never mutates
/// the stored data and reshuffles on every call.
#[derive(Debug, Clone, Default)]
pub struct QuestionPool {
    fields: BTreeMap<String, Vec<Question>>,
}

impl QuestionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The curated corpus embedded in the crate.
    pub fn builtin() -> Self {
        let raw_fields: BTreeMap<String, Vec<RawQuestion>> =
            serde_json::from_str(BUILTIN_BANK).expect("BUILTIN_BANK is valid");
        let mut pool = Self::new();
        for (field, raws) in raw_fields {
            pool.add_field(&field, &raws, SourceOrigin::CuratedPool);
        }
        pool
    }

    /// Normalize and admit a batch of raw records under `field`. Malformed
    /// records are skipped. Returns the number admitted.
    pub fn add_field(&mut self, field: &str, raws: &[RawQuestion], origin: SourceOrigin) -> usize {
        let batch = normalizer::normalize_batch_from(raws, origin);
        let admitted = batch.questions.len();
        self.fields
            .entry(field.to_string())
            .or_default()
            .extend(batch.questions);
        admitted
    }

    fn partition(&self, field: &str) -> &[Question] {
        self.fields
            .get(field)
            .or_else(|| self.fields.get(FALLBACK_FIELD))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// How many questions the field (or its fallback) can offer.
    pub fn available(&self, field: &str) -> usize {
        self.partition(field).len()
    }

    pub fn subjects_in_field(&self, field: &str) -> Vec<String> {
        let subjects: BTreeSet<&str> = self
            .partition(field)
            .iter()
            .map(|question| question.subject_tag.as_deref().unwrap_or(UNGROUPED_SUBJECT))
            .collect();
        subjects.into_iter().map(str::to_string).collect()
    }

    /// Draw up to `count` questions from the field, uniformly shuffled. When
    /// fewer are available the whole shuffled partition is returned.
    pub fn sample_mixed(&self, field: &str, count: usize) -> Vec<Question> {
        let mut drawn: Vec<Question> = self.partition(field).to_vec();
        drawn.shuffle(&mut thread_rng());
        drawn.truncate(count);
        drawn
    }

    /// Draw up to `per_subject` questions from each subject bucket of the
    /// field, then shuffle the concatenation so subject blocks are not
    /// contiguous. Undersized buckets are included whole.
    pub fn sample_per_subject(&self, field: &str, per_subject: usize) -> Vec<Question> {
        let mut rng = thread_rng();
        let mut buckets: BTreeMap<&str, Vec<Question>> = BTreeMap::new();
        for question in self.partition(field) {
            let subject = question.subject_tag.as_deref().unwrap_or(UNGROUPED_SUBJECT);
            buckets.entry(subject).or_default().push(question.clone());
        }
        let mut drawn = Vec::new();
        for bucket in buckets.values_mut() {
            bucket.shuffle(&mut rng);
            bucket.truncate(per_subject);
            drawn.append(bucket);
        }
        drawn.shuffle(&mut rng);
        drawn
    }

    /// Draw up to `count` questions tagged with `subject` inside the field.
    pub fn sample_subject(&self, field: &str, subject: &str, count: usize) -> Vec<Question> {
        let mut drawn: Vec<Question> = self
            .partition(field)
            .iter()
            .filter(|question| {
                question.subject_tag.as_deref().unwrap_or(UNGROUPED_SUBJECT) == subject
            })
            .cloned()
            .collect();
        drawn.shuffle(&mut thread_rng());
        drawn.truncate(count);
        drawn
    }
}
