//! Candidate discovery: sample random text ids until one yields a usable poem,
//! then generate its commentary and deliver the letter.
//!
//! Each attempt is an isolation boundary. Every failure inside it (fetch
//! error, bad status, malformed JSON, wrong genre, missing download, text too
//! short) becomes a [`Rejection`] and the loop moves on to the next id.
//! Delivery is the exception: a failed delivery ends the run with an error.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use anyhow::{Context, bail};
use rand::Rng;
use shira_ai::{CommentaryGenerator, CommentaryRequest};
use shira_core::{NormalizedContent, PoemRecord, Settings, Unsuitable, format_date, normalize};
use shira_library::{LibraryError, PortraitSource, TextSource};
use shira_mail::{Deliver, Letter, Message, Sender, render_message};
use tracing::{info, warn};

/// Why one candidate was skipped.
#[derive(Debug)]
enum Rejection {
    Metadata(LibraryError),
    Unsuitable(Unsuitable),
    Download(LibraryError),
    TooShort { chars: usize },
}

impl Rejection {
    fn kind(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::Unsuitable(Unsuitable::Genre(_)) => "genre",
            Self::Unsuitable(Unsuitable::NoDownloadUrl) => "no_download",
            Self::Unsuitable(Unsuitable::NoTitle) => "no_title",
            Self::Download(_) => "download",
            Self::TooShort { .. } => "too_short",
        }
    }
}

/// A candidate that passed every filter.
struct Accepted {
    poem: PoemRecord,
    content: NormalizedContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered { id: u32, title: String },
    Exhausted,
}

#[derive(Debug)]
pub struct DiscoveryStats {
    pub outcome: Outcome,
    pub attempts: u32,
    /// Skipped candidates by reason.
    pub rejections: BTreeMap<&'static str, u32>,
    pub elapsed_secs: f64,
}

/// Draws ids from `[1, max_id]`, optionally without repeats within a run.
struct IdSampler {
    max_id: u32,
    seen: Option<HashSet<u32>>,
}

impl IdSampler {
    fn new(max_id: u32, dedupe: bool) -> Self {
        Self {
            max_id,
            seen: dedupe.then(HashSet::new),
        }
    }

    fn draw<R: Rng>(&mut self, rng: &mut R) -> u32 {
        let Some(seen) = self.seen.as_mut() else {
            return rng.gen_range(1..=self.max_id);
        };
        // Whole id space drawn: start over rather than spin forever.
        if seen.len() >= self.max_id as usize {
            seen.clear();
        }
        loop {
            let id = rng.gen_range(1..=self.max_id);
            if seen.insert(id) {
                return id;
            }
        }
    }
}

/// Collaborators and settings for one discovery run.
pub struct Discovery<'a> {
    pub settings: &'a Settings,
    pub texts: &'a dyn TextSource,
    pub portraits: &'a dyn PortraitSource,
    pub commentary: &'a CommentaryGenerator,
    pub transport: &'a dyn Deliver,
    pub sender: &'a Sender,
    pub recipient: &'a str,
}

impl Discovery<'_> {
    /// Run the sampling loop until one poem is delivered or the attempt budget
    /// is spent.
    pub async fn run<R: Rng>(&self, rng: &mut R) -> anyhow::Result<DiscoveryStats> {
        let settings = self.settings;
        if settings.max_id == 0 {
            bail!("max id must be at least 1");
        }

        let start = Instant::now();
        let mut sampler = IdSampler::new(settings.max_id, settings.dedupe);
        let mut rejections: BTreeMap<&'static str, u32> = BTreeMap::new();

        for attempt in 1..=settings.max_attempts {
            let id = sampler.draw(rng);
            info!(attempt, id, "checking candidate");

            let accepted = match self.try_candidate(id).await {
                Ok(accepted) => accepted,
                Err(rejection) => {
                    match &rejection {
                        Rejection::Unsuitable(reason) => info!(id, %reason, "skipping"),
                        Rejection::TooShort { chars } => info!(id, chars, "skipping, text too short"),
                        Rejection::Metadata(e) | Rejection::Download(e) => {
                            info!(id, kind = rejection.kind(), error = %e, "skipping, fetch failed")
                        }
                    }
                    *rejections.entry(rejection.kind()).or_default() += 1;
                    continue;
                }
            };

            let title = accepted.poem.title.clone();
            self.deliver(&accepted)
                .await
                .with_context(|| format!("delivering text {id}"))?;

            return Ok(DiscoveryStats {
                outcome: Outcome::Delivered { id, title },
                attempts: attempt,
                rejections,
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
        }

        warn!(attempts = settings.max_attempts, "no usable poem found");
        Ok(DiscoveryStats {
            outcome: Outcome::Exhausted,
            attempts: settings.max_attempts,
            rejections,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Fetch, filter, and normalise one candidate.
    async fn try_candidate(&self, id: u32) -> Result<Accepted, Rejection> {
        let record = self.texts.fetch_text(id).await.map_err(Rejection::Metadata)?;
        let poem = record.into_poem(id).map_err(Rejection::Unsuitable)?;
        info!(id, title = %poem.title, author = %poem.author, "found a poem");

        let raw = self
            .texts
            .download(&poem.download_url)
            .await
            .map_err(Rejection::Download)?;

        let content = normalize(&raw, self.settings.word_budget);
        let chars = content.plain_text.chars().count();
        if chars < self.settings.min_chars {
            return Err(Rejection::TooShort { chars });
        }

        Ok(Accepted { poem, content })
    }

    /// Generate the commentary, resolve the portrait, render, and hand off.
    async fn deliver(&self, accepted: &Accepted) -> anyhow::Result<()> {
        let Accepted { poem, content } = accepted;
        let date = format_date(&poem.date);

        let commentary = self
            .commentary
            .generate(&CommentaryRequest {
                title: &poem.title,
                author: &poem.author,
                text: &content.plain_text,
                source: poem.bibliographic_info.as_deref(),
                missing_date: date.is_empty(),
            })
            .await;

        let portrait = self
            .portraits
            .find_portrait(poem.author_id.as_ref(), &poem.author)
            .await;

        let html = render_message(&Letter {
            title: &poem.title,
            author: &poem.author,
            date: &date,
            source: poem.bibliographic_info.as_deref(),
            portrait: portrait.as_deref(),
            poem_markup: &content.rendered_markup,
            page_url: poem.page_url.as_deref(),
            commentary: &commentary,
        });

        let message = Message {
            from: self.sender.address.clone(),
            to: self.recipient.to_string(),
            subject: Message::subject_for(&poem.title, &poem.author),
            html,
        };

        info!(
            id = poem.id,
            truncated = content.truncated,
            has_portrait = portrait.is_some(),
            "sending letter"
        );
        self.transport.deliver(&message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shira_ai::{Backend, BackendError, FALLBACK_COMMENTARY};
    use shira_core::{PublicationDate, Scalar, TextMetadata, TextRecord};
    use shira_mail::MailError;

    const POEM_HTML: &str = "<h2>כותרת</h2><p>שורה ראשונה של השיר</p><p>פרויקט בן-יהודה</p><p>שורה שנייה של השיר</p>";

    // ── Stubs ──

    /// Serves scripted metadata responses in call order; prose once the script runs out.
    struct StubTexts {
        script: Mutex<VecDeque<Result<TextRecord, LibraryError>>>,
        fetched_ids: Mutex<Vec<u32>>,
        downloads: Mutex<Vec<String>>,
        body: String,
    }

    impl StubTexts {
        fn new(script: Vec<Result<TextRecord, LibraryError>>) -> Self {
            Self::with_body(script, POEM_HTML)
        }

        fn with_body(script: Vec<Result<TextRecord, LibraryError>>, body: &str) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fetched_ids: Mutex::new(Vec::new()),
                downloads: Mutex::new(Vec::new()),
                body: body.to_string(),
            }
        }

        fn fetches(&self) -> usize {
            self.fetched_ids.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextSource for StubTexts {
        async fn fetch_text(&self, id: u32) -> Result<TextRecord, LibraryError> {
            self.fetched_ids.lock().unwrap().push(id);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(record("prose", Some("https://dl/prose"))))
        }

        async fn download(&self, url: &str) -> Result<String, LibraryError> {
            self.downloads.lock().unwrap().push(url.to_string());
            if url.contains("broken") {
                return Err(LibraryError::Server {
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(self.body.clone())
        }
    }

    struct NoPortraits;

    #[async_trait]
    impl PortraitSource for NoPortraits {
        async fn find_portrait(&self, _: Option<&Scalar>, _: &str) -> Option<String> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Message>>,
        fail: bool,
    }

    #[async_trait]
    impl Deliver for RecordingTransport {
        async fn deliver(&self, message: &Message) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Io {
                    path: format!("outbox/{}", message.to).into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct PromptRecorder {
        prompts: std::sync::Arc<Mutex<Vec<String>>>,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl Backend for PromptRecorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.map(str::to_string).ok_or(BackendError::Empty)
        }
    }

    // ── Helpers ──

    fn record(genre: &str, download_url: Option<&str>) -> TextRecord {
        TextRecord {
            metadata: TextMetadata {
                title: Some("זמר נוגה".into()),
                author_string: Some("רחל".into()),
                genre: Some(genre.into()),
                date: PublicationDate {
                    year: Some(Scalar::Int(1927)),
                    ..PublicationDate::default()
                },
                ..TextMetadata::default()
            },
            download_url: download_url.map(Into::into),
            url: Some("https://benyehuda.org/read/1".into()),
        }
    }

    fn poetry() -> Result<TextRecord, LibraryError> {
        Ok(record("poetry", Some("https://dl/poem")))
    }

    fn prose() -> Result<TextRecord, LibraryError> {
        Ok(record("prose", Some("https://dl/prose")))
    }

    fn settings(max_attempts: u32) -> Settings {
        Settings {
            max_attempts,
            rate_limit_pause: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn generator(reply: Option<&'static str>) -> (CommentaryGenerator, std::sync::Arc<Mutex<Vec<String>>>) {
        let prompts = std::sync::Arc::new(Mutex::new(Vec::new()));
        let backend = PromptRecorder {
            prompts: std::sync::Arc::clone(&prompts),
            reply,
        };
        (
            CommentaryGenerator::new(vec![Box::new(backend)], Duration::ZERO, 1500),
            prompts,
        )
    }

    fn sender() -> Sender {
        Sender {
            address: "bot@example.org".into(),
            app_password: "pw".into(),
        }
    }

    async fn run(
        settings: &Settings,
        texts: &StubTexts,
        commentary: &CommentaryGenerator,
        transport: &RecordingTransport,
    ) -> anyhow::Result<DiscoveryStats> {
        let sender = sender();
        let discovery = Discovery {
            settings,
            texts,
            portraits: &NoPortraits,
            commentary,
            transport,
            sender: &sender,
            recipient: "reader@example.org",
        };
        discovery.run(&mut StdRng::seed_from_u64(7)).await
    }

    // ── Tests ──

    #[tokio::test]
    async fn stops_at_first_poem() {
        let texts = StubTexts::new(vec![prose(), prose(), poetry(), poetry()]);
        let (commentary, _) = generator(Some("<p>ניתוח</p>"));
        let transport = RecordingTransport::default();

        let stats = run(&settings(50), &texts, &commentary, &transport).await.unwrap();

        assert_eq!(texts.fetches(), 3);
        assert_eq!(stats.attempts, 3);
        assert!(matches!(stats.outcome, Outcome::Delivered { ref title, .. } if title == "זמר נוגה"));
        assert_eq!(stats.rejections.get("genre"), Some(&2));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "זמר נוגה | רחל");
        assert_eq!(sent[0].from, "bot@example.org");
        assert_eq!(sent[0].to, "reader@example.org");
        assert!(sent[0].html.contains("<p>ניתוח</p>"));
        assert!(sent[0].html.contains("שורה ראשונה של השיר<br>שורה שנייה של השיר"));
        assert!(!sent[0].html.contains("פרויקט בן-יהודה<br>"));
    }

    #[tokio::test]
    async fn exhausts_budget_without_poetry() {
        let texts = StubTexts::new(vec![]);
        let (commentary, prompts) = generator(Some("x"));
        let transport = RecordingTransport::default();

        let stats = run(&settings(12), &texts, &commentary, &transport).await.unwrap();

        assert_eq!(stats.outcome, Outcome::Exhausted);
        assert_eq!(stats.attempts, 12);
        assert!(format!("{stats:?}").contains("Exhausted"));
        assert_eq!(texts.fetches(), 12);
        assert!(texts.downloads.lock().unwrap().is_empty());
        assert!(prompts.lock().unwrap().is_empty());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_isolated_per_attempt() {
        let texts = StubTexts::new(vec![
            Err(LibraryError::Server {
                status: 404,
                body: String::new(),
            }),
            Err(LibraryError::Json(serde_json_error())),
            Ok(record("poetry", None)),
            Ok(record("poetry", Some("https://dl/broken"))),
            poetry(),
        ]);
        let (commentary, _) = generator(Some("<p>ok</p>"));
        let transport = RecordingTransport::default();

        let stats = run(&settings(10), &texts, &commentary, &transport).await.unwrap();

        assert_eq!(stats.attempts, 5);
        assert_eq!(stats.rejections.get("metadata"), Some(&2));
        assert_eq!(stats.rejections.get("no_download"), Some(&1));
        assert_eq!(stats.rejections.get("download"), Some(&1));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    fn serde_json_error() -> serde_json::Error {
        serde_json::from_str::<TextRecord>("{").unwrap_err()
    }

    #[tokio::test]
    async fn short_text_is_rejected() {
        let texts = StubTexts::with_body(vec![poetry(), poetry()], "<p>קצר</p>");
        let (commentary, _) = generator(Some("x"));
        let transport = RecordingTransport::default();

        let stats = run(&settings(2), &texts, &commentary, &transport).await.unwrap();

        assert_eq!(stats.outcome, Outcome::Exhausted);
        assert_eq!(stats.rejections.get("too_short"), Some(&2));
    }

    #[tokio::test]
    async fn boilerplate_only_text_is_rejected() {
        let texts = StubTexts::with_body(vec![poetry()], "<h1>שיר</h1><p>פרויקט בן-יהודה באינטרנט</p>");
        let (commentary, _) = generator(Some("x"));
        let transport = RecordingTransport::default();

        let stats = run(&settings(1), &texts, &commentary, &transport).await.unwrap();
        assert_eq!(stats.outcome, Outcome::Exhausted);
    }

    #[tokio::test]
    async fn commentary_fallback_is_still_delivered() {
        let texts = StubTexts::new(vec![poetry()]);
        let (commentary, _) = generator(None);
        let transport = RecordingTransport::default();

        run(&settings(5), &texts, &commentary, &transport).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert!(sent[0].html.contains(FALLBACK_COMMENTARY));
    }

    #[tokio::test]
    async fn delivery_failure_fails_the_run() {
        let texts = StubTexts::new(vec![poetry(), poetry()]);
        let (commentary, _) = generator(Some("x"));
        let transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };

        let err = run(&settings(5), &texts, &commentary, &transport).await.unwrap_err();
        assert!(err.to_string().contains("delivering text"));
        assert_eq!(texts.fetches(), 1);
    }

    #[tokio::test]
    async fn prompt_uses_full_text_even_when_truncated() {
        let body = "<p>אחת שתיים שלוש</p><p>ארבע חמש שש</p><p>שבע שמונה תשע סוף</p>";
        let texts = StubTexts::with_body(vec![poetry()], body);
        let (commentary, prompts) = generator(Some("x"));
        let transport = RecordingTransport::default();
        let settings = Settings {
            word_budget: 4,
            ..settings(1)
        };

        run(&settings, &texts, &commentary, &transport).await.unwrap();

        assert!(prompts.lock().unwrap()[0].contains("שבע שמונה תשע סוף"));
        let sent = transport.sent.lock().unwrap();
        assert!(sent[0].html.contains("אחת שתיים שלוש..."));
        assert!(!sent[0].html.contains("סוף"));
    }

    #[tokio::test]
    async fn missing_date_asks_model_for_it() {
        let mut undated = record("poetry", Some("https://dl/poem"));
        undated.metadata.date = PublicationDate::default();
        let texts = StubTexts::new(vec![Ok(undated)]);
        let (commentary, prompts) = generator(Some("x"));
        let transport = RecordingTransport::default();

        run(&settings(1), &texts, &commentary, &transport).await.unwrap();

        assert!(prompts.lock().unwrap()[0].contains("שנת הפרסום חסרה"));
    }

    #[tokio::test]
    async fn known_date_is_shown() {
        let texts = StubTexts::new(vec![poetry()]);
        let (commentary, prompts) = generator(Some("x"));
        let transport = RecordingTransport::default();

        run(&settings(1), &texts, &commentary, &transport).await.unwrap();

        assert!(!prompts.lock().unwrap()[0].contains("שנת הפרסום חסרה"));
        assert!(transport.sent.lock().unwrap()[0].html.contains("רחל | 1927"));
    }

    #[tokio::test]
    async fn zero_max_id_is_an_error() {
        let texts = StubTexts::new(vec![]);
        let (commentary, _) = generator(Some("x"));
        let transport = RecordingTransport::default();
        let settings = Settings {
            max_id: 0,
            ..settings(1)
        };

        assert!(run(&settings, &texts, &commentary, &transport).await.is_err());
        assert_eq!(texts.fetches(), 0);
    }

    #[tokio::test]
    async fn sampled_ids_stay_in_range() {
        let texts = StubTexts::new(vec![]);
        let (commentary, _) = generator(Some("x"));
        let transport = RecordingTransport::default();
        let settings = Settings {
            max_id: 3,
            ..settings(40)
        };

        run(&settings, &texts, &commentary, &transport).await.unwrap();

        let ids = texts.fetched_ids.lock().unwrap();
        assert_eq!(ids.len(), 40);
        assert!(ids.iter().all(|id| (1..=3).contains(id)));
    }

    #[test]
    fn dedupe_draws_each_id_once_per_cycle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = IdSampler::new(6, true);
        let mut first: Vec<u32> = (0..6).map(|_| sampler.draw(&mut rng)).collect();
        first.sort_unstable();
        assert_eq!(first, vec![1, 2, 3, 4, 5, 6]);
        // Space exhausted: the next draw starts a fresh cycle.
        assert!((1..=6).contains(&sampler.draw(&mut rng)));
    }

    #[test]
    fn without_dedupe_repeats_are_allowed() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = IdSampler::new(1, false);
        assert_eq!(sampler.draw(&mut rng), 1);
        assert_eq!(sampler.draw(&mut rng), 1);
    }
}
