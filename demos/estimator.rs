use hll_bench::HyperLogLog;
use wyhash::WyHash;

fn main() -> hll_bench::Result<()> {
    let mut estimator1 = HyperLogLog::<WyHash>::new(14)?;
    for i in 0..10 {
        estimator1.insert(&i);
    }
    println!("estimator1 estimate = {}", estimator1.count());

    let mut estimator2 = HyperLogLog::<WyHash>::new(14)?;
    for i in 10..15 {
        estimator2.insert(&i);
    }
    println!("estimator2 estimate = {}", estimator2.count());

    estimator1.merge(&estimator2)?;
    println!("merged estimate = {}", estimator1.count());
    println!("merged estimator = {:?}", estimator1);

    Ok(())
}
