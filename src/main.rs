/*!

The `scion-path-sim` command-line front end: parses `--topology`/`--traffic`
JSON files plus the selection algorithm and PRNG seed, runs the simulation,
and prints a one-line summary (spec.md SS6).

*/

use std::path::Path;
use std::process::ExitCode;

use getopts::Options;

use scion_path_sim::config;
use scion_path_sim::error;
use scion_path_sim::error::Error;
use scion_path_sim::simulation::{Algorithm, Simulation};

fn print_usage(program: &str, opts: &Options)
{
	let brief = format!("Usage: {} --topology FILE --traffic FILE [options]", program);
	print!("{}", opts.usage(&brief));
}

fn run(args: &[String]) -> Result<(), Error>
{
	let program = args.get(0).cloned().unwrap_or_else(|| "scion-path-sim".to_string());

	let mut opts = Options::new();
	opts.reqopt("t", "topology", "path to the topology JSON file", "FILE");
	opts.reqopt("f", "traffic", "path to the traffic JSON file", "FILE");
	opts.optopt("a", "algorithm", "path selection algorithm: shortest or adaptive (default adaptive)", "NAME");
	opts.optopt("s", "seed", "PRNG seed (default 0)", "N");
	opts.optflag("h", "help", "print this help and exit");

	let matches = opts.parse(&args[1..]).map_err(|e| error!(bad_argument).with_message(e.to_string()))?;

	if matches.opt_present("h")
	{
		print_usage(&program, &opts);
		return Ok(());
	}

	let topology_path = matches.opt_str("topology").expect("reqopt guarantees presence");
	let traffic_path = matches.opt_str("traffic").expect("reqopt guarantees presence");

	let algorithm_name = matches.opt_str("algorithm").unwrap_or_else(|| "adaptive".to_string());
	let algorithm = Algorithm::parse(&algorithm_name).ok_or_else(||
		error!(bad_argument).with_message(format!("unknown algorithm '{}', expected 'shortest' or 'adaptive'", algorithm_name))
	)?;

	let seed: u64 = match matches.opt_str("seed")
	{
		Some(s) => s.parse().map_err(|_| error!(bad_argument).with_message(format!("seed '{}' is not a valid integer", s)))?,
		None => 0,
	};

	let topology_config = config::load_topology(Path::new(&topology_path))?;
	let traffic_config = config::load_traffic(Path::new(&traffic_path))?;

	let simulation = Simulation::build(&topology_config, traffic_config, algorithm, seed);
	let summary = simulation.run();
	println!("{}", summary);

	Ok(())
}

fn main() -> ExitCode
{
	let args: Vec<String> = std::env::args().collect();
	match run(&args)
	{
		Ok(()) => ExitCode::SUCCESS,
		Err(e) =>
		{
			eprintln!("scion-path-sim: {}", e);
			ExitCode::FAILURE
		}
	}
}
