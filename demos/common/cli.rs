use crate::common::backend::RecorderTy;
use burn::prelude::*;
use burn::record::FileRecorder;
use burn_vgg::prelude::*;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Burn VGG Example

Builds a VGG network and runs a single forward pass on random input.

USAGE:
    forward [OPTIONS]

BEHAVIOR OVERVIEW
- The model configuration is taken from --model-config if given, otherwise the default (VGG16, 3 input channels, 1000 classes) is used.
- --variant, --descriptor and the other model options override the loaded or default configuration.
- If --artifacts-path or --save is given, the configuration and the freshly initialized model are saved there.

FLAGS:
    -h, --help                  Show this help message and exit
    -s, --save                  Save the config and model (into a new temporary directory unless --artifacts-path is given)
        --no-init-weights       Keep the framework's default initializers
        --no-adaptive-pool      Require the feature map to match the pooled size (e.g. 224x224 or 244x244 inputs)

OPTIONS:
    -v, --variant <NAME>        VGG11, VGG13, VGG16 or VGG19
    -d, --descriptor <LIST>     Custom descriptor such as \"64,M,128,M\" (takes precedence over --variant)
        --in-channels <N>       Input channels [default: 3]
        --num-classes <N>       Output classes [default: 1000]
        --hidden-size <N>       Width of the hidden classifier layers [default: 4096]
        --batch <N>             Batch size of the random input [default: 1]
        --height <N>            Height of the random input [default: 244]
        --width <N>             Width of the random input [default: 244]
        --seed <N>              Seed for the backend's random generator [default: 0]
    -m, --model-config <PATH>   Load the model configuration from this JSON file
    -a, --artifacts-path <PATH> Directory where the config and model are saved.
                                If the directory does not exist, it will be created.
";

#[derive(Debug)]
pub struct AppArgs {
    pub variant: Option<VggVariant>,
    pub descriptor: Option<Architecture>,
    pub in_channels: Option<usize>,
    pub num_classes: Option<usize>,
    pub hidden_size: Option<usize>,
    pub no_init_weights: bool,
    pub no_adaptive_pool: bool,
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub seed: u64,
    pub model_config: Option<PathBuf>,
    pub artifacts_path: Option<PathBuf>,
}

impl AppArgs {
    pub fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        let mut args = AppArgs {
            variant: pargs.opt_value_from_str(["-v", "--variant"])?,
            descriptor: pargs.opt_value_from_str(["-d", "--descriptor"])?,
            in_channels: pargs.opt_value_from_str("--in-channels")?,
            num_classes: pargs.opt_value_from_str("--num-classes")?,
            hidden_size: pargs.opt_value_from_str("--hidden-size")?,
            batch: pargs.opt_value_from_str("--batch")?.unwrap_or(1),
            height: pargs.opt_value_from_str("--height")?.unwrap_or(244),
            width: pargs.opt_value_from_str("--width")?.unwrap_or(244),
            seed: pargs.opt_value_from_str("--seed")?.unwrap_or(0),
            model_config: pargs.opt_value_from_os_str(["-m", "--model-config"], parse_path)?,
            artifacts_path: pargs.opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?,
            // must parse flags after values
            no_init_weights: pargs.contains("--no-init-weights"),
            no_adaptive_pool: pargs.contains("--no-adaptive-pool"),
        };
        let save = pargs.contains(["-s", "--save"]);

        if save && args.artifacts_path.is_none() {
            // e.g. /tmp/burn-vgg-forward-abcd-0
            let name = format!(
                "{}-{}-",
                std::env!("CARGO_PKG_NAME"), // burn-vgg
                std::env!("CARGO_CRATE_NAME")  // forward
            );
            let tmp = temp_dir::TempDir::with_prefix(name)
                .expect("Failed to create the temporary directory")
                .dont_delete_on_drop();
            println!("new artifacts directory: {:?}", tmp.path());
            args.artifacts_path = Some(tmp.path().into());
        }

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            panic!("unused arguments: {remaining:?}");
        }

        Ok(args)
    }

    /// Loads or creates the model config, then applies the command-line overrides.
    pub fn model_config(&self) -> VggConfig {
        let mut config = self
            .model_config
            .as_ref()
            .map(|path| load_model_config(path))
            .unwrap_or_else(VggConfig::new);

        if let Some(variant) = self.variant {
            config.architecture = variant.into();
        }
        if let Some(descriptor) = &self.descriptor {
            config.architecture = descriptor.clone();
        }
        if let Some(in_channels) = self.in_channels {
            config.in_channels = in_channels;
        }
        if let Some(num_classes) = self.num_classes {
            config.num_classes = num_classes;
        }
        if let Some(hidden_size) = self.hidden_size {
            config.hidden_size = hidden_size;
        }
        if self.no_init_weights {
            config.init_weights = false;
        }
        if self.no_adaptive_pool {
            config.adaptive_pool = false;
        }
        config
    }

    pub fn save_model_config(&self, model_config: &VggConfig) {
        if let Some(artifacts_path) = &self.artifacts_path {
            std::fs::create_dir_all(artifacts_path).expect("Failed to create the artifacts directory");
            let path = artifacts_path.join(MODEL_CONFIG_NAME).with_extension("json");
            save_model_config(&path, model_config)
        }
    }

    pub fn save_model<B: Backend>(&self, model: &Vgg<B>) {
        if let Some(artifacts_path) = &self.artifacts_path {
            std::fs::create_dir_all(artifacts_path).expect("Failed to create the artifacts directory");
            save_model(artifacts_path, model)
        }
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<std::path::PathBuf, &'static str> {
    Ok(s.into())
}

pub const MODEL_CONFIG_NAME: &str = "model_config";
pub fn save_model_config(path: &Path, model_config: &VggConfig) {
    println!("Saving model config into {path:?}");
    model_config
        .save(path)
        .expect("Failed to save the model config");
}

pub fn load_model_config(path: &Path) -> VggConfig {
    println!("Loading model config from {path:?}");
    VggConfig::load(path).expect("Failed to load the model config")
}

pub const MODEL_NAME: &str = "model";
pub fn save_model<B: Backend>(artifact_dir: &Path, model: &Vgg<B>) {
    let path = artifact_dir.join(MODEL_NAME);
    let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
    println!("Saving model to {:?}", path.with_extension(file_ext));
    model
        .clone()
        .save_file(path, &RecorderTy::new()) // ext added automatically
        .expect("Failed to save the model");
}
