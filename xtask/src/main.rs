use std::time::{Duration, Instant};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::Client;
use hdrhistogram::Histogram;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:8080/v1/keywords".to_string());
    let clients = 4usize; // concurrent; the server runs one generation at a time
    let total = 40usize; // total requests
    let notes = vec![
        "Mr. Cleveland is a 17 yo M presenting with episodic heart racing. He has had 5-6 episodes of tachycardia over 2-3 months. During the last episode he had SOB and felt lightheaded.",
        "45 yo F with 3 days of productive cough, fever to 38.9C and pleuritic chest pain. Smoker, 20 pack-years.",
        "68 yo M, hx of HTN and T2DM, presents with sudden onset left arm weakness and slurred speech starting 1 hour ago.",
        "29 yo F reports fatigue, weight gain, cold intolerance and hair thinning for 6 months. Mother has thyroid disease.",
        "Denies diaphoresis, headaches, vision changes. No PMHx. No allergies. No surgeries. Occasionally drinks on weekends.",
    ];

    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(300))
        .build()?;
    let mut hist = Histogram::<u64>::new(3)?;
    let mut errors = 0usize;
    let mut parse_failures = 0usize;

    let start = Instant::now();
    let mut tasks = vec![];
    for _ in 0..clients {
        let client = client.clone();
        let url = url.clone();
        let notes = notes.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = vec![];
            let mut errs = 0;
            let mut unparsed = 0;
            for _ in 0..(total/clients) {
                let note = {
                    let mut rng = thread_rng();
                    notes.choose(&mut rng).unwrap().to_string()
                };
                let t0 = Instant::now();
                let res = client.post(&url).json(&serde_json::json!({"note": note})).send().await;
                let dur = t0.elapsed();
                match res {
                    Ok(r) if r.status().is_success() => { latencies.push(dur); }
                    Ok(r) if r.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY => { latencies.push(dur); unparsed += 1; }
                    _ => errs += 1,
                }
            }
            (latencies, errs, unparsed)
        }));
    }

    for t in tasks {
        let (ls, e, u) = t.await?;
        for d in ls { hist.record(d.as_millis() as u64).ok(); }
        errors += e;
        parse_failures += u;
    }

    println!("ran {} notes in {:?}", total, start.elapsed());
    println!("errors: {}", errors);
    println!("unparsed answers: {}", parse_failures);
    println!("p50: {} ms", hist.value_at_quantile(0.50));
    println!("p95: {} ms", hist.value_at_quantile(0.95));
    println!("p99: {} ms", hist.value_at_quantile(0.99));
    Ok(())
}
