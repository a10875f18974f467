//! Social routes: the follow graph.

use bridge_core::TankManifest;
use serde_json::{Value, json};

use super::payload::required_str;
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::error::HandlerError;

pub const TANK: &str = "social";
pub const CATEGORY: &str = "social";

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("follow_user", "Follow or unfollow a user.")
        .route("get_followers", "List the followers of a user.")
        .route("get_following", "List the users a user follows.")
        .mutating()
        .requires(&["username"])
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "follow_user",
        route(
            ctx,
            "Follow or unfollow a user.\n\nPayload: {\"username\", \"follower\"}. Returns {\"status\": \"followed\" | \"unfollowed\"}.",
            CATEGORY,
            follow_user,
        ),
    );
    registry.register_route_once(
        "get_followers",
        route(
            ctx,
            "List the followers of a user.\n\nPayload: {\"username\"}. Returns {\"count\", \"followers\"}.",
            CATEGORY,
            get_followers,
        ),
    );
    registry.register_route_once(
        "get_following",
        route(
            ctx,
            "List the users a user follows.\n\nPayload: {\"username\"}. Returns {\"count\", \"following\"}.",
            CATEGORY,
            get_following,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

async fn follow_user(ctx: RouteContext, payload: Value) -> RouteResult {
    let username = required_str(&payload, "username")?;
    let follower = required_str(&payload, "follower")?;
    if username == follower {
        return Err(HandlerError::invalid("cannot follow yourself"));
    }

    let action = ctx.follows.toggle(follower, username).await?;
    tracing::debug!(follower, username, action = action.as_str(), "Toggled follow");
    Ok(json!({ "status": action.as_str() }))
}

async fn get_followers(ctx: RouteContext, payload: Value) -> RouteResult {
    let username = required_str(&payload, "username")?;
    let followers = ctx.follows.followers(username).await?;
    Ok(json!({ "count": followers.len(), "followers": followers }))
}

async fn get_following(ctx: RouteContext, payload: Value) -> RouteResult {
    let username = required_str(&payload, "username")?;
    let following = ctx.follows.following(username).await?;
    Ok(json!({ "count": following.len(), "following": following }))
}
