//! Rating workflow
//!
//! One request handler per visitor action. Each takes the visitor's current
//! [`SessionContext`] and returns a [`Step`]: the next session state plus the
//! view to render. Errors are caught here, at the boundary of the action
//! that raised them, and reported on the view; a failed action hands back
//! the session it was given, so a visitor whose rating could not be stored
//! still has the same image in front of them.
//!
//! ```text
//! Anonymous --login/register--> Presenting --rate/skip--> Presenting ... --> Completed
//!      ^                                                                        |
//!      +-------------------------------- logout --------------------------------+
//! ```

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::ImageCatalog;
use crate::models::{Progress, Score};
use crate::session::SessionContext;
use crate::store::Storage;
use crate::{Error, Result};

/// Which screen the visitor should see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    /// Login / register forms
    Auth,
    /// An image awaiting a score
    Rating { image: String },
    /// Every catalog image has been rated; only logout remains
    Completed,
    /// Logged in, but the catalog or store could not be read
    Unavailable,
}

/// Everything needed to render one response
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub screen: Screen,
    pub user: Option<String>,
    /// Recomputed on every step; absent on the auth screen
    pub progress: Option<Progress>,
    /// Ratings stored across all users (diagnostic)
    pub total_records: Option<u64>,
    /// False when ratings are only held in memory
    pub persistent: bool,
    pub notice: Option<String>,
    pub error: Option<String>,
}

/// Outcome of one visitor action
#[derive(Debug, Clone)]
pub struct Step {
    pub session: SessionContext,
    pub view: View,
    pub error: Option<Error>,
}

/// What a successful action produced, before presentation
struct Transition {
    session: SessionContext,
    notice: Option<String>,
    /// Image to avoid when drawing the next one
    avoid: Option<String>,
}

impl Transition {
    fn to(session: SessionContext) -> Self {
        Self {
            session,
            notice: None,
            avoid: None,
        }
    }

    fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

struct Presentation {
    screen: Screen,
    progress: Option<Progress>,
    total_records: Option<u64>,
}

pub struct RatingWorkflow {
    catalog: ImageCatalog,
    storage: Storage,
    shared_password: String,
}

impl RatingWorkflow {
    pub fn new(catalog: ImageCatalog, storage: Storage, shared_password: impl Into<String>) -> Self {
        Self {
            catalog,
            storage,
            shared_password: shared_password.into(),
        }
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Redisplay the current screen; the held image does not change
    pub async fn show(&self, session: SessionContext) -> Step {
        self.conclude(session, Ok(None)).await
    }

    pub async fn login(&self, session: SessionContext, username: &str, password: &str) -> Step {
        let result = self.authenticate(username, password).await.map(|user| {
            info!("User {} logged in", user);
            Some(Transition::to(SessionContext::authenticated(user)))
        });
        self.conclude(session, result).await
    }

    pub async fn register(&self, session: SessionContext, username: &str, password: &str) -> Step {
        let result = self.create_user(username, password).await.map(|user| {
            info!("Registered new user {}", user);
            Some(
                Transition::to(SessionContext::authenticated(user.clone()))
                    .with_notice(format!("Welcome, {}!", user)),
            )
        });
        self.conclude(session, result).await
    }

    /// Record `score` for the held image.
    ///
    /// `score` is the submitted text; anything but a whole number in range is
    /// reported as `InvalidScore`. `image` is the image the submitting form
    /// was rendered for; when given it must match the held image, which turns
    /// a resubmitted stale form into an error rather than a rating of the
    /// wrong picture.
    pub async fn rate(&self, session: SessionContext, image: Option<&str>, score: &str) -> Step {
        let result = self.record(&session, image, score).await.map(Some);
        self.conclude(session, result).await
    }

    /// Drop the held image without rating it and draw another
    pub async fn skip(&self, session: SessionContext) -> Step {
        let result = if session.is_authenticated() {
            let mut next = session.clone();
            let skipped = next.current_image.take();
            if let Some(image) = &skipped {
                debug!("Skipped {}", image);
            }
            Ok(Some(Transition {
                session: next,
                notice: None,
                avoid: skipped,
            }))
        } else {
            Err(Error::NotAuthenticated)
        };
        self.conclude(session, result).await
    }

    pub async fn logout(&self, session: SessionContext) -> Step {
        if let Some(user) = &session.user {
            info!("User {} logged out", user);
        }
        let mut next = session.clone();
        next.reset();
        self.conclude(session, Ok(Some(Transition::to(next).with_notice("Logged out"))))
            .await
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let username = username.trim();
        if password != self.shared_password || username.is_empty() {
            return Err(Error::InvalidCredentials);
        }
        if !self.storage.identities.exists(username).await? {
            return Err(Error::InvalidCredentials);
        }
        Ok(username.to_string())
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<String> {
        if password != self.shared_password {
            return Err(Error::InvalidCredentials);
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::EmptyUsername);
        }
        if self.storage.identities.exists(username).await? {
            return Err(Error::UsernameTaken);
        }
        match self.storage.identities.create(username).await {
            Ok(()) => Ok(username.to_string()),
            Err(Error::DuplicateUser(_)) => Err(Error::UsernameTaken),
            Err(e) => Err(e),
        }
    }

    async fn record(
        &self,
        session: &SessionContext,
        image: Option<&str>,
        score: &str,
    ) -> Result<Transition> {
        let user = session.user.as_deref().ok_or(Error::NotAuthenticated)?;
        let held = session.current_image.as_deref().ok_or(Error::NothingToRate)?;
        if let Some(submitted) = image {
            if submitted != held {
                return Err(Error::StaleSubmission {
                    expected: held.to_string(),
                    submitted: submitted.to_string(),
                });
            }
        }
        let score: Score = score.parse()?;

        self.storage.ratings.upsert(user, held, score).await?;
        info!("User {} rated {} with {}", user, held, score);

        let mut next = session.clone();
        next.current_image = None;
        Ok(Transition::to(next).with_notice(format!("Rating saved: {} for {}", score, held)))
    }

    /// Turn an action result into a step, presenting the resulting session
    async fn conclude(
        &self,
        original: SessionContext,
        result: Result<Option<Transition>>,
    ) -> Step {
        let (mut session, notice, avoid, mut error) = match result {
            Ok(Some(t)) => (t.session, t.notice, t.avoid, None),
            Ok(None) => (original, None, None, None),
            Err(e) => {
                log_failure(&e);
                (original, None, None, Some(e))
            }
        };

        let presentation = match self.present(&mut session, avoid.as_deref()).await {
            Ok(p) => p,
            Err(e) => {
                log_failure(&e);
                if error.is_none() {
                    error = Some(e);
                }
                Presentation {
                    screen: Screen::Unavailable,
                    progress: None,
                    total_records: None,
                }
            }
        };

        // Anonymous visitors always see the auth screen
        let screen = if session.is_authenticated() {
            presentation.screen
        } else {
            Screen::Auth
        };

        let view = View {
            screen,
            user: session.user.clone(),
            progress: presentation.progress,
            total_records: presentation.total_records,
            persistent: self.storage.persistent,
            notice,
            error: error.as_ref().map(ToString::to_string),
        };

        Step {
            session,
            view,
            error,
        }
    }

    /// Enter Presenting or Completed for an authenticated session.
    ///
    /// Keeps the held image while it is still unrated, otherwise draws one
    /// uniformly from the unrated set (avoiding `avoid` if anything else is
    /// left). Leaves the session untouched on error.
    async fn present(&self, session: &mut SessionContext, avoid: Option<&str>) -> Result<Presentation> {
        let Some(user) = session.user.as_deref() else {
            return Ok(Presentation {
                screen: Screen::Auth,
                progress: None,
                total_records: None,
            });
        };

        let all = self.catalog.list_all().await?;
        let rated = self.storage.ratings.ratings_for(user).await?;
        let total_records = self.storage.ratings.count().await?;

        let unrated: Vec<&String> = all.iter().filter(|image| !rated.contains(*image)).collect();
        let progress = Progress {
            rated: all.len() - unrated.len(),
            total: all.len(),
        };

        let held = session
            .current_image
            .as_deref()
            .filter(|image| unrated.iter().any(|u| u.as_str() == *image))
            .map(str::to_string);

        let next = match held {
            Some(image) => Some(image),
            None => pick(&unrated, avoid),
        };

        let screen = match &next {
            Some(image) => {
                debug!("Presenting {} to {} ({}/{})", image, user, progress.rated, progress.total);
                Screen::Rating {
                    image: image.clone(),
                }
            }
            None => Screen::Completed,
        };
        session.current_image = next;

        Ok(Presentation {
            screen,
            progress: Some(progress),
            total_records: Some(total_records),
        })
    }
}

/// Uniform choice among `unrated`, excluding `avoid` unless it is the only one
fn pick(unrated: &[&String], avoid: Option<&str>) -> Option<String> {
    let preferred: Vec<&String> = unrated
        .iter()
        .copied()
        .filter(|image| Some(image.as_str()) != avoid)
        .collect();
    let pool = if preferred.is_empty() { unrated } else { &preferred[..] };

    pool.choose(&mut rand::thread_rng()).map(|image| (*image).clone())
}

fn log_failure(e: &Error) {
    match e {
        Error::StoreUnavailable(_) | Error::CatalogUnavailable(_) => warn!("{}", e),
        _ => debug!("Action rejected: {}", e),
    }
}
