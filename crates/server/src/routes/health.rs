/// Liveness check
///
/// Always `200 text/plain` "OK". Touches neither the workspace root nor the
/// toolchain, so it stays green while compilations are stuck.
pub async fn healthcheck() -> &'static str {
    "OK"
}
