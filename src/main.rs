use std::process;
use std::sync::Arc;

use vnf_psa::nfvo::Nfvo;
use vnf_psa::utils::config::Arguments;
use vnf_psa::utils::error::Result;
use vnf_psa::utils::observer::LogObserver;
use vnf_psa::utils::yaml;

fn main() {
    pretty_env_logger::init();
    let args: Arguments = argh::from_env();
    if let Err(err) = run(args) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn run(args: Arguments) -> Result<()> {
    let mut config = yaml::load_config(&args.config)?;
    let problem = yaml::load_problem(&args.problem)?;
    config.override_from_args(args);

    let mut nfvo = Nfvo::new(problem, config);
    nfvo.add_observer(Arc::new(LogObserver));
    let time = nfvo.configure()?;
    println!("--- computing time: {} μs ---", time);
    print!("{}", nfvo.report());
    Ok(())
}
