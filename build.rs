//! Retrieves information about the version of the engine from Git and the build
//! environment. The constants are generated into the output directory and are
//! available at runtime through the `build` module.

fn main() -> shadow_rs::SdResult<()> {
    let _ = shadow_rs::ShadowBuilder::builder().build()?;
    Ok(())
}
