use minentropy_core::DecisionPath;

pub fn run() {
    for path in [DecisionPath::Iid, DecisionPath::NonIid] {
        println!("{path} path:");
        for kind in path.estimators() {
            println!("  {kind}");
        }
        println!();
    }
    println!("Samples wider than one bit are also assessed as a bitstring;");
    println!("those results are reported as \"<name> (bitstring)\".");
}
