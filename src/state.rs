//! Writer application state and its reducer.
//!
//! A single [`WriterState`] is owned by one session task. It changes only
//! through [`WriterState::reduce`], which applies an [`Action`] and returns
//! the [`Effect`]s the owner must carry out (resolving sizes, running the
//! layout, scheduling notification dismissal). The reducer itself performs no
//! I/O and draws no random numbers.

use crate::keywords::{
    current_keyword, extract_keywords, highlight_spans, keyword_color_map, locate_caret,
    CaretPosition, TextSpan,
};
use crate::layout::{Layout, LayoutConfig};
use crate::models::{
    ColorToken, GalleryItem, ImageRecord, Notification, NotificationKind, Position, Size,
    ViewportTransform,
};
use crate::reconciler::{FetchOutcome, NO_RESULTS_MESSAGE};
use crate::sizes::SizeCache;
use crate::viewport::{focus_item, pan_by, pinch_zoom, wheel_zoom, Viewport};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The editor text changed; `generation` is the fetch issued for it.
    TextChanged { text: String, generation: u64 },
    /// Caret moved inside the editor, as a character offset.
    CaretMoved(usize),
    SearchStarted { generation: u64 },
    SearchCompleted {
        generation: u64,
        keywords: Vec<String>,
        outcome: FetchOutcome,
    },
    SizeResolved { id: String, size: Size },
    LayoutComputed(Layout),
    ViewportResized(Viewport),
    Select(usize),
    FocusKeyword(String),
    Next,
    Previous,
    CloseViewer,
    Wheel { delta_y: f64 },
    /// Two-finger zoom, relative to the gesture's starting scale and spread.
    Pinch {
        initial_scale: f64,
        initial_distance: f64,
        distance: f64,
    },
    Pan { dx: f64, dy: f64 },
    NotificationExpired(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Measure these images; each answer comes back as `SizeResolved`.
    ResolveSizes(Vec<ImageRecord>),
    /// Every size is known: run the packer and dispatch `LayoutComputed`.
    RunLayout {
        sizes: Vec<Size>,
        config: LayoutConfig,
    },
    /// Dispatch `NotificationExpired(id)` after the display period.
    DismissNotification(u64),
}

#[derive(Debug, Clone, Default)]
pub struct WriterState {
    pub text: String,
    pub keywords: Vec<String>,
    /// Every keyword colored so far; entries never change once added.
    pub colors: BTreeMap<String, ColorToken>,
    pub gallery: Vec<GalleryItem>,
    pub sizes: SizeCache,
    /// Present only when computed for the current gallery and sizes.
    pub layout: Option<Layout>,
    pub viewport: Viewport,
    pub transform: ViewportTransform,
    pub selected: Option<usize>,
    pub searching: bool,
    pub notification: Option<Notification>,
    pub caret: Option<usize>,
    /// Latest fetch generation issued for a text change.
    pub generation: u64,
    next_notification_id: u64,
}

impl WriterState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig::for_viewport_width(self.viewport.width)
    }

    pub fn position(&self, index: usize) -> Option<Position> {
        self.layout
            .as_ref()
            .and_then(|l| l.positions.get(index))
            .copied()
    }

    pub fn size(&self, index: usize) -> Option<Size> {
        self.gallery
            .get(index)
            .and_then(|item| self.sizes.get(item.id()))
    }

    /// Keyword of the selected card, or the last extracted keyword.
    pub fn current_keyword(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.gallery.get(i))
            .map(|item| item.keyword.as_str())
            .or_else(|| current_keyword(&self.keywords))
    }

    pub fn reduce(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::TextChanged { text, generation } => {
                self.keywords = extract_keywords(&text);
                self.text = text;
                self.generation = generation;
                Vec::new()
            }
            Action::SearchStarted { generation } => {
                if generation == self.generation {
                    self.searching = true;
                }
                Vec::new()
            }
            Action::SearchCompleted {
                generation,
                keywords,
                outcome,
            } => {
                if generation != self.generation {
                    log::debug!(
                        "discarding stale generation {} (latest {})",
                        generation,
                        self.generation
                    );
                    return Vec::new();
                }
                self.searching = false;
                self.commit(keywords, outcome)
            }
            Action::SizeResolved { id, size } => {
                if !self.gallery.iter().any(|item| item.id() == id) {
                    return Vec::new();
                }
                if self.sizes.insert(&id, size) {
                    self.layout = None;
                }
                self.layout_effect().into_iter().collect()
            }
            Action::LayoutComputed(layout) => {
                if layout.positions.len() == self.gallery.len() {
                    self.layout = Some(layout);
                }
                Vec::new()
            }
            Action::ViewportResized(viewport) => {
                let before = self.layout_config();
                self.viewport = viewport;
                if self.layout_config() != before {
                    self.layout = None;
                    return self.layout_effect().into_iter().collect();
                }
                Vec::new()
            }
            Action::Select(index) => {
                if index < self.gallery.len() {
                    self.selected = Some(index);
                    self.focus(index);
                }
                Vec::new()
            }
            Action::FocusKeyword(keyword) => {
                if let Some(index) = self.gallery.iter().position(|i| i.keyword == keyword) {
                    self.focus(index);
                }
                Vec::new()
            }
            Action::Next => {
                if let Some(i) = self.selected {
                    if i + 1 < self.gallery.len() {
                        self.selected = Some(i + 1);
                        self.focus(i + 1);
                    }
                }
                Vec::new()
            }
            Action::Previous => {
                if let Some(i) = self.selected {
                    if i > 0 {
                        self.selected = Some(i - 1);
                        self.focus(i - 1);
                    }
                }
                Vec::new()
            }
            Action::CloseViewer => {
                self.selected = None;
                self.transform = ViewportTransform::IDENTITY;
                Vec::new()
            }
            Action::Wheel { delta_y } => {
                self.transform = wheel_zoom(self.transform, delta_y);
                Vec::new()
            }
            Action::Pinch {
                initial_scale,
                initial_distance,
                distance,
            } => {
                self.transform =
                    pinch_zoom(self.transform, initial_scale, initial_distance, distance);
                Vec::new()
            }
            Action::Pan { dx, dy } => {
                self.transform = pan_by(self.transform, dx, dy);
                Vec::new()
            }
            Action::CaretMoved(offset) => {
                self.caret = Some(offset);
                Vec::new()
            }
            Action::NotificationExpired(id) => {
                if self.notification.as_ref().map(|n| n.id) == Some(id) {
                    self.notification = None;
                }
                Vec::new()
            }
        }
    }

    /// Replace the gallery wholesale with a committed outcome.
    fn commit(&mut self, keywords: Vec<String>, outcome: FetchOutcome) -> Vec<Effect> {
        self.layout = None;
        self.selected = None;

        match outcome {
            FetchOutcome::Gallery(items) => {
                for (keyword, color) in keyword_color_map(&keywords) {
                    self.colors.entry(keyword).or_insert(color);
                }
                self.gallery = items;
                self.sizes.retain_gallery(&self.gallery);

                let mut effects = Vec::new();
                let missing: Vec<ImageRecord> = self
                    .sizes
                    .missing(&self.gallery)
                    .into_iter()
                    .map(|item| item.image.clone())
                    .collect();
                if !missing.is_empty() {
                    effects.push(Effect::ResolveSizes(missing));
                }
                effects.extend(self.layout_effect());
                effects
            }
            FetchOutcome::Cleared => {
                self.clear_gallery();
                Vec::new()
            }
            FetchOutcome::NoResults => {
                self.clear_gallery();
                vec![self.notify(NotificationKind::Info, NO_RESULTS_MESSAGE.to_string())]
            }
            FetchOutcome::Failed(message) => {
                self.clear_gallery();
                vec![self.notify(NotificationKind::Error, message)]
            }
        }
    }

    fn clear_gallery(&mut self) {
        self.gallery.clear();
        self.sizes = SizeCache::default();
    }

    fn notify(&mut self, kind: NotificationKind, message: String) -> Effect {
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notification = Some(Notification { id, message, kind });
        Effect::DismissNotification(id)
    }

    fn layout_effect(&self) -> Option<Effect> {
        if self.layout.is_some() || self.gallery.is_empty() {
            return None;
        }
        self.sizes
            .sizes_for(&self.gallery)
            .map(|sizes| Effect::RunLayout {
                sizes,
                config: self.layout_config(),
            })
    }

    /// Move the camera onto a card; a no-op until it has a position and size.
    fn focus(&mut self, index: usize) {
        if let Some(t) = focus_item(self.position(index), self.size(index), &self.viewport) {
            self.transform = t;
        }
    }

    pub fn snapshot(&self) -> WriterSnapshot {
        let spans = highlight_spans(&self.text, &self.colors);
        WriterSnapshot {
            caret: self.caret.map(|offset| locate_caret(&spans, offset)),
            spans,
            keywords: self.keywords.clone(),
            colors: self.colors.clone(),
            gallery: self.gallery.clone(),
            positions: (0..self.gallery.len()).map(|i| self.position(i)).collect(),
            sizes: (0..self.gallery.len()).map(|i| self.size(i)).collect(),
            canvas: self.layout.as_ref().map(|l| CanvasSize {
                width: l.canvas_width,
                height: l.canvas_height,
            }),
            transform: self.transform,
            selected: self.selected,
            current_keyword: self.current_keyword().map(str::to_string),
            searching: self.searching,
            notification: self.notification.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Everything the page needs to render one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriterSnapshot {
    pub spans: Vec<TextSpan>,
    /// Where the caret lands in `spans` after re-rendering.
    pub caret: Option<CaretPosition>,
    pub keywords: Vec<String>,
    pub colors: BTreeMap<String, ColorToken>,
    pub gallery: Vec<GalleryItem>,
    pub positions: Vec<Option<Position>>,
    pub sizes: Vec<Option<Size>>,
    pub canvas: Option<CanvasSize>,
    pub transform: ViewportTransform,
    pub selected: Option<usize>,
    pub current_keyword: Option<String>,
    pub searching: bool,
    pub notification: Option<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::keyword_color;
    use crate::layout::calculate_layout;
    use crate::viewport::FOCUS_SCALE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, keyword: &str) -> GalleryItem {
        GalleryItem {
            image: ImageRecord {
                id: id.to_string(),
                url: format!("https://images.unsplash.com/{}", id),
                alt_description: String::new(),
                photographer_name: "Unknown".to_string(),
                photographer_username: None,
                photographer_profile: None,
                download_location: None,
            },
            keyword: keyword.to_string(),
            color: keyword_color(keyword),
        }
    }

    fn typed(state: &mut WriterState, text: &str, generation: u64) {
        state.reduce(Action::TextChanged {
            text: text.to_string(),
            generation,
        });
    }

    fn complete(state: &mut WriterState, generation: u64, outcome: FetchOutcome) -> Vec<Effect> {
        let keywords = state.keywords.clone();
        state.reduce(Action::SearchCompleted {
            generation,
            keywords,
            outcome,
        })
    }

    /// Drive a committed gallery through size resolution and layout.
    fn settle(state: &mut WriterState, effects: Vec<Effect>) {
        let mut pending = effects;
        while let Some(effect) = pending.pop() {
            match effect {
                Effect::ResolveSizes(images) => {
                    for image in images {
                        pending.extend(state.reduce(Action::SizeResolved {
                            id: image.id,
                            size: Size::new(300.0, 200.0),
                        }));
                    }
                }
                Effect::RunLayout { sizes, config } => {
                    let layout = calculate_layout(&sizes, &config, &mut StdRng::seed_from_u64(1));
                    pending.extend(state.reduce(Action::LayoutComputed(layout)));
                }
                Effect::DismissNotification(_) => {}
            }
        }
    }

    #[test]
    fn test_commit_replaces_gallery_and_requests_sizes() {
        let mut state = WriterState::default();
        typed(&mut state, "the quiet ocean at dawn", 1);
        assert_eq!(state.keywords, vec!["quiet", "ocean", "dawn"]);

        let effects = complete(
            &mut state,
            1,
            FetchOutcome::Gallery(vec![item("q", "quiet"), item("o", "ocean")]),
        );
        assert_eq!(state.gallery.len(), 2);
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::ResolveSizes(images) if images.len() == 2));
        assert_eq!(state.colors.len(), 3);
        assert!(state.notification.is_none());

        settle(&mut state, effects);
        let snapshot = state.snapshot();
        assert!(snapshot.positions.iter().all(Option::is_some));
        assert!(snapshot.canvas.is_some());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut state = WriterState::default();
        typed(&mut state, "quiet ocean", 1);
        typed(&mut state, "quiet dawn", 2);

        let effects = complete(&mut state, 2, FetchOutcome::Gallery(vec![item("d", "dawn")]));
        settle(&mut state, effects);

        // the older batch lands late
        let effects = state.reduce(Action::SearchCompleted {
            generation: 1,
            keywords: vec!["quiet".into(), "ocean".into()],
            outcome: FetchOutcome::Gallery(vec![item("o", "ocean")]),
        });
        assert!(effects.is_empty());
        assert_eq!(state.gallery, vec![item("d", "dawn")]);
        assert!(state.layout.is_some());
    }

    #[test]
    fn test_cleared_text_is_silent() {
        let mut state = WriterState::default();
        typed(&mut state, "quiet ocean", 1);
        let effects = complete(&mut state, 1, FetchOutcome::Gallery(vec![item("o", "ocean")]));
        settle(&mut state, effects);

        typed(&mut state, "", 2);
        let effects = complete(&mut state, 2, FetchOutcome::Cleared);
        assert!(effects.is_empty());
        assert!(state.gallery.is_empty());
        assert!(state.layout.is_none());
        assert!(state.notification.is_none());
    }

    #[test]
    fn test_no_results_notifies_and_expires() {
        let mut state = WriterState::default();
        typed(&mut state, "zzzzzz", 1);
        let effects = complete(&mut state, 1, FetchOutcome::NoResults);
        assert!(state.gallery.is_empty());

        let note = state.notification.clone().unwrap();
        assert_eq!(note.kind, NotificationKind::Info);
        assert_eq!(note.message, NO_RESULTS_MESSAGE);
        assert_eq!(effects, vec![Effect::DismissNotification(note.id)]);

        // an unrelated id leaves it alone
        state.reduce(Action::NotificationExpired(note.id + 1));
        assert!(state.notification.is_some());
        state.reduce(Action::NotificationExpired(note.id));
        assert!(state.notification.is_none());
    }

    #[test]
    fn test_failure_notifies_error() {
        let mut state = WriterState::default();
        typed(&mut state, "ocean", 1);
        complete(&mut state, 1, FetchOutcome::Failed("boom".to_string()));
        let note = state.notification.unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "boom");
    }

    #[test]
    fn test_searching_flag_tracks_latest_generation() {
        let mut state = WriterState::default();
        typed(&mut state, "ocean", 1);
        typed(&mut state, "ocean dawn", 2);
        state.reduce(Action::SearchStarted { generation: 1 });
        assert!(!state.searching);
        state.reduce(Action::SearchStarted { generation: 2 });
        assert!(state.searching);
        complete(&mut state, 2, FetchOutcome::NoResults);
        assert!(!state.searching);
    }

    #[test]
    fn test_size_for_unknown_image_is_ignored() {
        let mut state = WriterState::default();
        typed(&mut state, "ocean", 1);
        complete(&mut state, 1, FetchOutcome::Gallery(vec![item("o", "ocean")]));
        let effects = state.reduce(Action::SizeResolved {
            id: "gone".to_string(),
            size: Size::DEFAULT,
        });
        assert!(effects.is_empty());
        assert!(state.sizes.get("gone").is_none());
    }

    #[test]
    fn test_select_focuses_once_laid_out() {
        let mut state = WriterState::new(Viewport::new(1000.0, 800.0));
        typed(&mut state, "quiet ocean", 1);
        let effects = complete(
            &mut state,
            1,
            FetchOutcome::Gallery(vec![item("q", "quiet"), item("o", "ocean")]),
        );

        // before layout: selection works, camera stays put
        state.reduce(Action::Select(1));
        assert_eq!(state.selected, Some(1));
        assert_eq!(state.transform, ViewportTransform::IDENTITY);
        assert_eq!(state.current_keyword(), Some("ocean"));

        settle(&mut state, effects);
        state.reduce(Action::Select(0));
        assert_eq!(state.transform.scale, FOCUS_SCALE);
        assert_eq!(state.current_keyword(), Some("quiet"));

        state.reduce(Action::Select(7));
        assert_eq!(state.selected, Some(0));

        state.reduce(Action::CloseViewer);
        assert_eq!(state.selected, None);
        assert_eq!(state.transform, ViewportTransform::IDENTITY);
        assert_eq!(state.current_keyword(), Some("ocean"));
    }

    #[test]
    fn test_next_previous_stay_in_bounds() {
        let mut state = WriterState::default();
        typed(&mut state, "quiet ocean", 1);
        complete(
            &mut state,
            1,
            FetchOutcome::Gallery(vec![item("q", "quiet"), item("o", "ocean")]),
        );
        state.reduce(Action::Next);
        assert_eq!(state.selected, None);

        state.reduce(Action::Select(0));
        state.reduce(Action::Previous);
        assert_eq!(state.selected, Some(0));
        state.reduce(Action::Next);
        state.reduce(Action::Next);
        assert_eq!(state.selected, Some(1));
    }

    #[test]
    fn test_viewport_class_change_relayouts() {
        let mut state = WriterState::new(Viewport::new(1280.0, 800.0));
        typed(&mut state, "ocean", 1);
        let effects = complete(&mut state, 1, FetchOutcome::Gallery(vec![item("o", "ocean")]));
        settle(&mut state, effects);
        assert_eq!(state.layout.as_ref().unwrap().canvas_width, 1200.0);

        // same class: nothing to do
        assert!(state
            .reduce(Action::ViewportResized(Viewport::new(1000.0, 700.0)))
            .is_empty());

        let effects = state.reduce(Action::ViewportResized(Viewport::new(375.0, 700.0)));
        assert!(matches!(&effects[..], [Effect::RunLayout { config, .. }] if config.canvas_width == 400.0));
        settle(&mut state, effects);
        assert_eq!(state.layout.as_ref().unwrap().canvas_width, 400.0);
    }

    #[test]
    fn test_gestures_move_the_camera() {
        let mut state = WriterState::default();
        state.reduce(Action::Pinch {
            initial_scale: 1.0,
            initial_distance: 100.0,
            distance: 200.0,
        });
        assert_eq!(state.transform.scale, 2.0);
        state.reduce(Action::Wheel { delta_y: 500.0 });
        assert!((state.transform.scale - 1.5).abs() < 1e-9);
        state.reduce(Action::Pan { dx: 30.0, dy: -10.0 });
        assert_eq!(state.transform.offset_x, 30.0);
        assert_eq!(state.transform.offset_y, -10.0);
    }

    #[test]
    fn test_caret_follows_highlighted_spans() {
        let mut state = WriterState::default();
        typed(&mut state, "an ocean view", 1);
        assert_eq!(state.snapshot().caret, None);

        complete(&mut state, 1, FetchOutcome::Gallery(vec![item("o", "ocean")]));
        state.reduce(Action::CaretMoved(5));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.spans.len(), 3);
        assert_eq!(snapshot.caret, Some(CaretPosition { span: 1, offset: 2 }));

        // text shrinks under the caret: clamp to the end
        typed(&mut state, "an", 2);
        assert_eq!(
            state.snapshot().caret,
            Some(CaretPosition { span: 0, offset: 2 })
        );
    }

    #[test]
    fn test_colors_are_stable_across_commits() {
        let mut state = WriterState::default();
        typed(&mut state, "ocean", 1);
        complete(&mut state, 1, FetchOutcome::Gallery(vec![item("o", "ocean")]));
        let before = state.colors["ocean"];

        typed(&mut state, "ocean dawn", 2);
        complete(
            &mut state,
            2,
            FetchOutcome::Gallery(vec![item("o2", "ocean"), item("d", "dawn")]),
        );
        assert_eq!(state.colors["ocean"], before);
        assert_eq!(state.gallery[0].color, before);
    }
}
