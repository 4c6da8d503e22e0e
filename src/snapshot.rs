//! Builds the per-run profile snapshot.

use anyhow::Context;

use crate::provider::{Profile, Provider};
use crate::reconcile::{compare_and_log, ListChanges};
use crate::store::{Identity, ProfileSnapshot};

/// Assemble a snapshot of `profile`, enumerating the complete follower and
/// followee lists. Nothing is paged across runs, so the cost grows with the
/// follower count every time.
pub async fn build_snapshot(
    provider: &dyn Provider,
    profile: &Profile,
) -> anyhow::Result<ProfileSnapshot> {
    let followers = provider
        .followers(profile)
        .await
        .with_context(|| format!("Failed to list followers of {}", profile.username))?;
    let following = provider
        .followees(profile)
        .await
        .with_context(|| format!("Failed to list followees of {}", profile.username))?;

    tracing::debug!(
        followers = followers.len(),
        following = following.len(),
        "Enumerated follower lists"
    );

    Ok(ProfileSnapshot {
        followers_count: profile.followers,
        following_count: profile.followees,
        bio: profile.biography.clone(),
        profile_pic_url: profile.profile_pic_url.clone(),
        followers,
        following,
    })
}

/// Follower and following differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerChanges {
    pub followers: ListChanges<Identity>,
    pub following: ListChanges<Identity>,
}

/// Log who started or stopped following (or being followed) since
/// `previous`. A renamed account shows up as one removal plus one addition.
pub fn follower_changes(previous: &ProfileSnapshot, current: &ProfileSnapshot) -> FollowerChanges {
    FollowerChanges {
        followers: compare_and_log(&previous.followers, &current.followers, "followers"),
        following: compare_and_log(&previous.following, &current.following, "following"),
    }
}
