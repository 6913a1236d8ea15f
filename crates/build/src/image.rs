//! Content-addressed container build images.
//!
//! An image's tag is derived from the rendered recipe, so bumping a toolchain
//! version produces a new tag and an unchanged recipe reuses the image that
//! is already present. No eviction step exists.

use crate::catalog;
use crate::engine::ContainerEngine;
use sha2::{Digest, Sha256};
use toolsmith_core::{Context, Error, Platform, Result};
use tracing::{debug, info};

/// Recipe of the image Go container builds run in.
pub const GO_BUILDER_RECIPE: &str = include_str!("../recipes/go-builder.Dockerfile");

/// Repository name of the Go builder image.
pub const GO_BUILDER_IMAGE: &str = "toolsmith-go-builder";

/// Bytes of the recipe digest kept in the tag.
const TAG_DIGEST_BYTES: usize = 4;

/// Substitute `{key}` placeholders in `template`.
#[must_use]
pub fn render(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{key}}}"), value)
        })
}

/// `<name>:<hex of the first bytes of sha256(recipe)>`
#[must_use]
pub fn image_tag(name: &str, recipe: &str) -> String {
    let digest = Sha256::digest(recipe.as_bytes());
    format!("{name}:{}", hex::encode(&digest[..TAG_DIGEST_BYTES]))
}

/// Return the tag of the image built from `recipe`, building it first if
/// the engine does not have it.
///
/// # Errors
///
/// Returns engine errors from the lookup or the build.
pub async fn obtain(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    name: &str,
    recipe: &str,
) -> Result<String> {
    let tag = image_tag(name, recipe);
    if engine.image_exists(ctx, &tag).await? {
        debug!(image = %tag, "Reusing builder image");
        return Ok(tag);
    }

    info!(image = %tag, "Building builder image");
    let label = ctx.config().container.label();
    engine.build_image(ctx, &tag, recipe, &label).await?;
    Ok(tag)
}

/// Render the Go builder recipe for `platform`.
///
/// # Errors
///
/// Returns an error if `platform` is not the container platform or the go
/// tool is not registered.
pub fn go_builder_recipe(ctx: &Context, platform: Platform) -> Result<String> {
    if !platform.is_container() {
        return Err(Error::UnsupportedPlatform {
            requested: platform.to_string(),
            supported: Platform::DOCKER_AMD64.to_string(),
        });
    }
    let go = ctx.registry().get(catalog::GO)?;
    let arch = platform.arch.to_string();
    Ok(render(
        GO_BUILDER_RECIPE,
        &[
            ("arch", arch.as_str()),
            ("go_version", go.version()),
            ("alpine_version", ctx.config().container.alpine_version.as_str()),
        ],
    ))
}

/// Tag of the Go builder image for `platform`, built on first use.
///
/// # Errors
///
/// See [`go_builder_recipe`] and [`obtain`].
pub async fn go_builder_image(
    ctx: &Context,
    engine: &dyn ContainerEngine,
    platform: Platform,
) -> Result<String> {
    let recipe = go_builder_recipe(ctx, platform)?;
    obtain(ctx, engine, GO_BUILDER_IMAGE, &recipe).await
}
