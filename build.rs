use std::error::Error;
use std::fs::read_to_string;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

mod build_shader_map;
use build_shader_map::ShaderMapGenerator;

const SHADER_FILES: [&str; 1] = ["lbm/collide_stream"];

fn main() -> Result<(), Box<dyn Error>> {
    let base_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    println!("cargo:rerun-if-changed=shader-wgsl");

    let preprocessed_dir = out_dir.join("shader-preprocessed-wgsl");
    std::fs::create_dir_all(&preprocessed_dir)?;

    let mut map_generator = ShaderMapGenerator::new();
    for name in SHADER_FILES {
        regenerate_shader(name, &base_dir, &preprocessed_dir, &mut map_generator)?;
    }
    map_generator.generate_code(&out_dir)?;

    Ok(())
}

fn regenerate_shader(
    shader_name: &str, base_dir: &Path, preprocessed_dir: &Path,
    map_generator: &mut ShaderMapGenerator,
) -> Result<(), Box<dyn Error>> {
    let path = base_dir.join("shader-wgsl").join(format!("{}.wgsl", shader_name));
    println!("cargo:rerun-if-changed={}", path.display());
    let code = read_to_string(&path).map_err(|e| format!("Unable to read {:?}: {:?}", path, e))?;

    let mut shader_source = String::new();
    parse_shader_source(&code, &mut shader_source, base_dir)?;
    let key = shader_name.replace('/', "_");
    map_generator.insert(key.clone(), shader_source.clone());

    let mut f = std::fs::File::create(preprocessed_dir.join(format!("{}.wgsl", key)))?;
    f.write_all(shader_source.as_bytes())?;

    Ok(())
}

fn parse_shader_source(
    source: &str, output: &mut String, base_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let include: &str = "#include ";
    for line in source.lines() {
        if let Some(imports) = line.strip_prefix(include) {
            // For each import, get the source, and recurse.
            for import in imports.split(',') {
                let include = get_shader_funcs(import, base_dir)?;
                parse_shader_source(&include, output, base_dir)?;
            }
        } else if !line.trim_start().starts_with("//") {
            output.push_str(line);
            output.push('\n');
        }
    }
    Ok(())
}

fn get_shader_funcs(key: &str, base_dir: &Path) -> Result<String, Box<dyn Error>> {
    let path = base_dir.join("shader-wgsl").join(key.trim().replace('"', ""));
    println!("cargo:rerun-if-changed={}", path.display());
    let shader = read_to_string(&path)
        .map_err(|e| format!("can't find shader functions {:?}: {:?}", path, e))?;
    Ok(shader)
}
