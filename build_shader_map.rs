use std::collections::BTreeMap;
use std::error::Error;
use std::io::prelude::*;
use std::path::Path;

/// Collects preprocessed WGSL sources and emits them as a `lazy_static` map.
pub struct ShaderMapGenerator {
    shaders: BTreeMap<String, String>,
}

impl ShaderMapGenerator {
    pub fn new() -> Self {
        Self { shaders: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: String, val: String) {
        self.shaders.insert(key, val);
    }

    pub fn generate_code(&self, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        let mut code = String::from(
            r#"
lazy_static::lazy_static! {
    pub static ref SHADER_MAP: std::collections::HashMap<&'static str, &'static str> = {
        let mut m = std::collections::HashMap::new();
"#,
        );
        for (k, v) in self.shaders.iter() {
            // Debug formatting yields a valid, escaped Rust string literal
            code.push_str(&format!("        m.insert({:?}, {:?});\n", k, v));
        }
        code.push_str(
            r#"        m
    };
}
"#,
        );

        let mut f = std::fs::File::create(out_dir.join("shader_map.rs"))?;
        f.write_all(code.as_bytes())?;

        Ok(())
    }
}
