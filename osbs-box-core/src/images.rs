//! Moving images into the local registry.

use crate::context::Context;
use crate::error::BoxError;

const DOCKER_TRANSPORT: &str = "docker://";

/// Compose service whose image wraps `skopeo copy`.
pub const SKOPEO_SERVICE: &str = "skopeo-lite";

/// Pull `source` with the engine, retag it as `<registry>/<destination>` and
/// push it. Returns the pushed reference.
pub fn pull_image(ctx: &Context<'_>, source: &str, destination: &str) -> Result<String, BoxError> {
    let target = ctx.config.registry_ref(destination);
    tracing::info!("Pulling {source} and pushing it to {target}");
    ctx.run(&ctx.engine().args(["pull", source]))?;
    ctx.run(&ctx.engine().args(["tag", source, target.as_str()]))?;
    ctx.run(&ctx.engine().args(["push", target.as_str()]))?;
    Ok(target)
}

/// Copy an image, manifest list included, straight into the local registry
/// using the skopeo-lite helper container. Returns the destination reference.
pub fn copy_image(ctx: &Context<'_>, source: &str, destination: &str) -> Result<String, BoxError> {
    let target = format!("{DOCKER_TRANSPORT}{}", ctx.config.registry_ref(destination));
    let source = with_transport(source);
    tracing::info!("Copying {source} to {target}");

    // Compose names built images `<project>_<service>`.
    let helper = format!("{}_{}", ctx.config.project, SKOPEO_SERVICE);
    ctx.run(&ctx.engine().args([
        "run",
        "--rm",
        helper.as_str(),
        "copy",
        "--src-tls-verify=false",
        "--dest-tls-verify=false",
        source.as_str(),
        target.as_str(),
    ]))?;
    Ok(target)
}

fn with_transport(source: &str) -> String {
    if source.starts_with(DOCKER_TRANSPORT) {
        source.to_string()
    } else {
        format!("{DOCKER_TRANSPORT}{source}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_added_once() {
        assert_eq!(with_transport("fedora:28"), "docker://fedora:28");
        assert_eq!(
            with_transport("docker://quay.io/x/y:1"),
            "docker://quay.io/x/y:1"
        );
    }
}
