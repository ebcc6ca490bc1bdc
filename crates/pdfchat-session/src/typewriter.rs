//! Character-by-character reveal of assistant answers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What a renderer should currently display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reveal {
    /// The exposed prefix of the text being revealed.
    pub text: String,
    /// `true` until the full text is exposed.
    pub typing: bool,
    run: u64,
}

/// Reveals text one character per tick and signals completion.
///
/// Each call to [`reveal`](Typewriter::reveal) starts a new run. Updates from
/// an older run are ignored even if its task is still winding down.
#[derive(Debug)]
pub struct Typewriter {
    delay: Duration,
    state: Arc<watch::Sender<Reveal>>,
    task: Option<JoinHandle<()>>,
}

impl Typewriter {
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(Reveal::default());
        Self {
            delay: delay.max(Duration::from_millis(1)),
            state: Arc::new(tx),
            task: None,
        }
    }

    /// Start revealing `full_text`, aborting any reveal already running.
    ///
    /// `on_complete` runs exactly once, in the same tick that exposes the
    /// full text. It never runs if the reveal is cancelled first. Must be
    /// called within a tokio runtime.
    pub fn reveal<F>(&mut self, full_text: impl Into<String>, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.abort_task();

        let full_text = full_text.into();
        let mut run = 0;
        self.state.send_modify(|reveal| {
            reveal.run += 1;
            reveal.text.clear();
            reveal.typing = true;
            run = reveal.run;
        });

        let state = Arc::clone(&self.state);
        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            let ends = char_ends(&full_text);
            let total = ends.len().max(1);
            for step in 1..=total {
                interval.tick().await;
                let end = ends.get(step - 1).copied().unwrap_or(0);
                let done = step == total;
                let applied = state.send_if_modified(|reveal| {
                    if reveal.run != run {
                        return false;
                    }
                    reveal.text.clear();
                    reveal.text.push_str(&full_text[..end]);
                    reveal.typing = !done;
                    true
                });
                if !applied {
                    return;
                }
            }

            tracing::trace!(chars = ends.len(), "Reveal complete");
            on_complete();
        }));
    }

    /// Stop the current reveal without completing it. The exposed prefix
    /// stays visible.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.state.send_modify(|reveal| {
            reveal.run += 1;
            reveal.typing = false;
        });
    }

    /// Cancel any reveal and drop the exposed text.
    pub fn clear(&mut self) {
        self.cancel();
        self.state.send_modify(|reveal| reveal.text.clear());
    }

    pub fn subscribe(&self) -> watch::Receiver<Reveal> {
        self.state.subscribe()
    }

    pub fn is_typing(&self) -> bool {
        self.state.borrow().typing
    }

    pub fn revealed(&self) -> String {
        self.state.borrow().text.clone()
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Byte offsets just past each character, so every prefix is valid UTF-8.
fn char_ends(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, c)| i + c.len_utf8()).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(30);

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_char_ends_multibyte() {
        assert_eq!(char_ends("ab"), vec![1, 2]);
        assert_eq!(char_ends("é!"), vec![2, 3]);
        assert!(char_ends("").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_grows_and_completes_once() {
        let mut typewriter = Typewriter::new(DELAY);
        let (count, on_complete) = counter();
        let text = "It is about X.";
        typewriter.reveal(text, on_complete);
        assert!(typewriter.is_typing());
        assert_eq!(typewriter.revealed(), "");

        let mut last_len = 0;
        let mut saw_full = 0;
        for _ in 0..40 {
            tokio::time::sleep(DELAY).await;
            let revealed = typewriter.revealed();
            assert!(text.starts_with(&revealed));
            assert!(revealed.len() >= last_len);
            if revealed.len() == text.len() && last_len < text.len() {
                saw_full += 1;
            }
            last_len = revealed.len();
        }

        assert_eq!(saw_full, 1);
        assert_eq!(typewriter.revealed(), text);
        assert!(!typewriter.is_typing());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_takes_one_tick_per_char() {
        let mut typewriter = Typewriter::new(DELAY);
        let (count, on_complete) = counter();
        typewriter.reveal("abcd", on_complete);

        tokio::time::sleep(DELAY * 3 + DELAY / 2).await;
        assert_eq!(typewriter.revealed(), "abc");
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(DELAY).await;
        assert_eq!(typewriter.revealed(), "abcd");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_multibyte_prefixes() {
        let mut typewriter = Typewriter::new(DELAY);
        let mut rx = typewriter.subscribe();
        let (_count, on_complete) = counter();
        typewriter.reveal("héllo wörld", on_complete);

        loop {
            rx.changed().await.unwrap();
            let reveal = rx.borrow_and_update().clone();
            assert!("héllo wörld".starts_with(&reveal.text));
            if !reveal.typing {
                break;
            }
        }
        assert_eq!(typewriter.revealed(), "héllo wörld");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_completes_on_first_tick() {
        let mut typewriter = Typewriter::new(DELAY);
        let (count, on_complete) = counter();
        typewriter.reveal("", on_complete);

        tokio::time::sleep(DELAY + DELAY / 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!typewriter.is_typing());
        assert_eq!(typewriter.revealed(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_reveal_aborts_previous() {
        let mut typewriter = Typewriter::new(DELAY);
        let (first, first_done) = counter();
        let (second, second_done) = counter();

        typewriter.reveal("first answer", first_done);
        tokio::time::sleep(DELAY * 3).await;
        typewriter.reveal("second", second_done);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(typewriter.revealed(), "second");
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_never_completes() {
        let mut typewriter = Typewriter::new(DELAY);
        let (count, on_complete) = counter();
        typewriter.reveal("some long answer", on_complete);
        tokio::time::sleep(DELAY * 2 + DELAY / 2).await;

        typewriter.cancel();
        let partial = typewriter.revealed();
        assert_eq!(partial, "so");
        assert!(!typewriter.is_typing());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(typewriter.revealed(), partial);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_text() {
        let mut typewriter = Typewriter::new(DELAY);
        let (_count, on_complete) = counter();
        typewriter.reveal("abc", on_complete);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(typewriter.revealed(), "abc");

        typewriter.clear();
        assert_eq!(typewriter.revealed(), "");
        assert!(!typewriter.is_typing());
    }
}
