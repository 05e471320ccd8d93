use anyhow::Context;

fn main() -> anyhow::Result<()> {
    meural_cropper::run().context("meural-cropper run failed")
}
