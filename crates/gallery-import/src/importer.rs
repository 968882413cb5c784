use std::collections::HashSet;
use std::sync::Arc;

use validator::Validate;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};
use gallery_store::models::{NewProfile, NewProfileImage, UpdateProfile};
use gallery_store::Storage;

use crate::fixture::{parse_fixtures, Document, ProfileFixture};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Clear a profile's existing posts before inserting the fixture's posts.
    pub replace_posts: bool,
    /// Report what would change without writing.
    pub dry_run: bool,
    /// Store every imported profile as inactive.
    pub inactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub posts_added: usize,
    pub posts_skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} posts added, {} posts skipped, {} failed",
            self.created, self.updated, self.posts_added, self.posts_skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileAction {
    Created,
    Updated,
}

#[derive(Debug)]
struct FixtureOutcome {
    action: ProfileAction,
    posts_added: usize,
    posts_skipped: usize,
}

pub struct Importer {
    storage: Arc<dyn Storage>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(storage: Arc<dyn Storage>, options: ImportOptions) -> Self {
        Self { storage, options }
    }

    /// Imports every fixture of every document. A document that does not
    /// parse counts as one failure; a failing fixture does not stop the run.
    pub async fn run(&self, documents: &[Document]) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for document in documents {
            let fixtures = match parse_fixtures(&document.bytes) {
                Ok(fixtures) => fixtures,
                Err(e) => {
                    tracing::warn!(origin = %document.origin, error = %e, "skipping unparseable document");
                    summary.failed += 1;
                    continue;
                }
            };

            for fixture in fixtures {
                let name = fixture.profile.name.clone();
                match self.import_fixture(fixture).await {
                    Ok(outcome) => {
                        match outcome.action {
                            ProfileAction::Created => summary.created += 1,
                            ProfileAction::Updated => summary.updated += 1,
                        }
                        summary.posts_added += outcome.posts_added;
                        summary.posts_skipped += outcome.posts_skipped;
                    }
                    Err(e) => {
                        tracing::warn!(origin = %document.origin, profile = %name, error = %e, "fixture failed");
                        summary.failed += 1;
                    }
                }
            }
        }

        summary
    }

    async fn import_fixture(&self, fixture: ProfileFixture) -> AppResult<FixtureOutcome> {
        let ProfileFixture { mut profile, posts } = fixture;
        if self.options.inactive {
            profile.is_active = Some(false);
        }

        profile.validate()?;
        for post in &posts {
            check_post(post)?;
        }

        let existing = match profile.id.as_deref() {
            Some(id) => self.storage.get_profile(id).await?,
            None => None,
        };
        let action = if existing.is_some() { ProfileAction::Updated } else { ProfileAction::Created };

        let mut known_urls = HashSet::new();
        if let (Some(existing), false) = (&existing, self.options.replace_posts) {
            for image in self.storage.list_images(&existing.id).await? {
                known_urls.extend(image.image_url);
                known_urls.extend(image.video_url);
            }
        }

        let (fresh, posts_skipped) = dedupe_posts(posts, &mut known_urls);

        if self.options.dry_run {
            tracing::info!(
                profile = %profile.name,
                action = ?action,
                posts = fresh.len(),
                skipped = posts_skipped,
                "dry run"
            );
            return Ok(FixtureOutcome { action, posts_added: fresh.len(), posts_skipped });
        }

        let profile_id = match existing {
            Some(existing) => {
                self.storage
                    .update_profile(&existing.id, update_from(profile))
                    .await?
                    .ok_or_else(|| AppError::profile_not_found(&existing.id))?;
                if self.options.replace_posts {
                    let removed = self.storage.clear_images(&existing.id).await?;
                    tracing::debug!(profile_id = %existing.id, removed, "replacing posts");
                }
                existing.id
            }
            None => self.storage.create_profile(profile).await?.id,
        };

        let mut posts_added = 0;
        let mut posts_skipped = posts_skipped;
        for post in fresh {
            match self.storage.add_image(&profile_id, post).await {
                Ok(_) => posts_added += 1,
                Err(e) if e.code() == ErrorCode::ImageAlreadyExists => posts_skipped += 1,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(profile_id = %profile_id, action = ?action, posts_added, posts_skipped, "profile imported");
        Ok(FixtureOutcome { action, posts_added, posts_skipped })
    }
}

fn check_post(post: &NewProfileImage) -> AppResult<()> {
    post.validate()?;
    if post.media_url().is_none() {
        return Err(AppError::new(
            ErrorCode::MissingMediaUrl,
            "a post needs an imageUrl or a videoUrl",
        ));
    }
    post.resolve_content_type()?;
    Ok(())
}

/// Drops posts whose image or video URL is already known, including
/// duplicates within the fixture itself. Returns the kept posts and the
/// number dropped.
fn dedupe_posts(posts: Vec<NewProfileImage>, known: &mut HashSet<String>) -> (Vec<NewProfileImage>, usize) {
    let mut kept = Vec::with_capacity(posts.len());
    let mut skipped = 0;

    for post in posts {
        let urls: Vec<&String> = post.image_url.iter().chain(post.video_url.iter()).collect();
        if urls.iter().any(|u| known.contains(u.as_str())) {
            skipped += 1;
            continue;
        }
        known.extend(urls.into_iter().cloned());
        kept.push(post);
    }

    (kept, skipped)
}

fn update_from(profile: NewProfile) -> UpdateProfile {
    UpdateProfile {
        name: Some(profile.name),
        title: profile.title,
        category: profile.category,
        location: profile.location,
        description: profile.description,
        picture_url: profile.picture_url,
        cover_url: profile.cover_url,
        rating: profile.rating,
        review_count: profile.review_count,
        likes_count: profile.likes_count,
        media_count: profile.media_count,
        views_count: profile.views_count,
        subscribers_count: profile.subscribers_count,
        tags: Some(profile.tags),
        is_active: profile.is_active,
    }
}
