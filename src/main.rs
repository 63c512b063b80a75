use lit_cube::{SceneConfig, run};

fn main() -> anyhow::Result<()> {
    run(SceneConfig::default())
}
