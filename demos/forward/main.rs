use burn::prelude::*;
use burn::tensor::Distribution;
use burn_vgg::prelude::*;
pub use common::{
    backend::{DemoBackend, DemoDevice},
    cli::AppArgs,
};

#[path = "../common/mod.rs"]
pub mod common;

pub fn launch<B: Backend + DemoDevice>(app_args: &AppArgs) {
    let device = B::demo_device();
    B::seed(&device, app_args.seed);

    let model_config = app_args.model_config();
    println!("backend: {}", B::NAME);
    println!("architecture: {}", model_config.architecture);
    app_args.save_model_config(&model_config);

    let input_size = [app_args.height, app_args.width];
    if let Err(e) = model_config.check_input_size(input_size) {
        eprintln!("cannot run {}x{} inputs: {e}", app_args.height, app_args.width);
        std::process::exit(1);
    }

    let model: Vgg<B> = match model_config.try_init(&device) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("cannot build the model: {e}");
            std::process::exit(1);
        }
    };
    println!("parameters: {}", model.num_params());
    app_args.save_model(&model);

    let x = Tensor::<B, 4>::random(
        [
            app_args.batch,
            model_config.in_channels,
            app_args.height,
            app_args.width,
        ],
        Distribution::Normal(0., 1.),
        &device,
    );
    println!("input shape: {:?}", x.dims());

    let start = std::time::Instant::now();
    let features = model.forward_features(x);
    println!("feature shape: {:?}", features.dims());
    let y = model.forward_head(features);
    println!("output shape: {:?}", y.dims());
    println!("forward ran in {:.2?}", start.elapsed());
}

fn main() {
    let app_args = AppArgs::parse().unwrap();
    launch::<DemoBackend>(&app_args);
}
