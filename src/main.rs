use spike_predictor::local::process_file;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "file" => process_file::run().unwrap(),
            "synth" => process_file::run_synthetic().unwrap(),
            _ => println!("Invalid argument, please use 'file' or 'synth'"),
        }
    } else {
        println!("Please specify 'file' or 'synth' as argument");
    }
}
