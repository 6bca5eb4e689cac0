//! # Worker Pool
//!
//! Pool de tamanho fixo que aplica uma `RowTransform` a cada registro.
//!
//! A entrega para os workers passa por um canal de capacidade 1 (o menor
//! canal limitado do tokio): `submit` suspende a fonte até que um worker
//! retire a tarefa anterior. Essa é a única forma de backpressure do
//! pipeline. A ordem de saída entre workers diferentes não é garantida.

use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ConfigError, ETLError, Result};
use crate::traits::RowTransform;
use crate::transform::common::apply_guarded;
use crate::types::{Outcome, PoolState, Task, TaskResult};

const HANDOFF_CAPACITY: usize = 1;

type SharedTasks<I> = Arc<Mutex<mpsc::Receiver<Task<I>>>>;

/// Pool de workers concorrentes
pub struct WorkerPool<I, O> {
    tasks: Option<mpsc::Sender<Task<I>>>,
    results: Option<mpsc::Receiver<TaskResult<O>>>,
    workers: Vec<JoinHandle<()>>,
    state: AtomicU8,
    size: usize,
    next_seq: AtomicUsize,
}

impl<I, O> WorkerPool<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Cria o pool e inicia `pool_size` workers.
    ///
    /// Precisa ser chamado dentro de um runtime tokio. `pool_size == 0` falha
    /// com erro de configuração antes de iniciar qualquer worker.
    ///
    /// A transformação roda de forma síncrona nas threads do runtime: só há
    /// paralelismo real num runtime multi-thread. Num `current_thread` os
    /// workers se alternam e a vazão é a de um único worker.
    pub fn new<T>(transform: T, pool_size: usize) -> Result<Self>
    where
        T: RowTransform<I, O>,
    {
        if pool_size == 0 {
            return Err(ETLError::Config(ConfigError::invalid("pool_size", pool_size)));
        }

        let (task_tx, task_rx) = mpsc::channel::<Task<I>>(HANDOFF_CAPACITY);
        let (result_tx, result_rx) = mpsc::channel::<TaskResult<O>>(HANDOFF_CAPACITY);
        let shared_tasks: SharedTasks<I> = Arc::new(Mutex::new(task_rx));
        let transform = Arc::new(transform);

        let workers = (0..pool_size)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&transform),
                    Arc::clone(&shared_tasks),
                    result_tx.clone(),
                ))
            })
            .collect();

        // só os workers seguram o lado de envio: o stream de resultados
        // termina exatamente quando o último worker sai
        drop(result_tx);

        debug!(pool_size, "Pool de workers iniciado");

        Ok(Self {
            tasks: Some(task_tx),
            results: Some(result_rx),
            workers,
            state: AtomicU8::new(PoolState::Open as u8),
            size: pool_size,
            next_seq: AtomicUsize::new(1),
        })
    }

    /// Enfileira um registro, numerado em ordem de submissão
    pub async fn submit(&self, record: I) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.submit_task(Task::new(seq, record)).await
    }

    /// Enfileira uma tarefa já numerada pela fonte.
    ///
    /// Suspende até haver espaço no canal de entrada. Falha com
    /// `ETLError::PoolClosed` depois de `close` ou se nenhum worker restar.
    pub async fn submit_task(&self, task: Task<I>) -> Result<()> {
        if self.state() != PoolState::Open {
            return Err(ETLError::PoolClosed);
        }
        let sender = self.tasks.as_ref().ok_or(ETLError::PoolClosed)?;
        sender.send(task).await.map_err(|_| ETLError::PoolClosed)
    }

    /// Entrega o stream de resultados. Só pode ser chamado uma vez: há um
    /// único consumidor.
    pub fn results(&mut self) -> Result<ResultStream<O>> {
        self.results
            .take()
            .map(|rx| ResultStream { rx })
            .ok_or_else(|| ETLError::Pipeline("stream de resultados já foi entregue".to_string()))
    }

    /// Fecha a entrada, espera todos os workers terminarem e então o stream
    /// de resultados se encerra.
    ///
    /// A transição `Open -> Closing` é única: uma segunda chamada devolve
    /// `ETLError::PoolClosed`. Os resultados precisam estar sendo consumidos,
    /// senão os workers ficam presos no envio e esta chamada não retorna.
    pub async fn close(&mut self) -> Result<()> {
        self.state
            .compare_exchange(
                PoolState::Open as u8,
                PoolState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| ETLError::PoolClosed)?;

        drop(self.tasks.take());

        let mut failure = None;
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "Worker terminou de forma anormal");
                failure.get_or_insert(err);
            }
        }

        self.state.store(PoolState::Closed as u8, Ordering::Release);
        debug!(pool_size = self.size, "Pool de workers fechado");

        match failure {
            Some(err) => Err(ETLError::Pipeline(format!("worker abortou: {}", err))),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

async fn worker_loop<I, O, T>(
    worker_id: usize,
    transform: Arc<T>,
    tasks: SharedTasks<I>,
    results: mpsc::Sender<TaskResult<O>>,
) where
    T: RowTransform<I, O>,
{
    loop {
        // o lock é solto antes de aplicar a transformação
        let next = tasks.lock().await.recv().await;
        let Some(Task { seq, record }) = next else {
            break;
        };

        let result = match apply_guarded(transform.as_ref(), record) {
            Outcome::Emit(record) => TaskResult::Emitted { seq, record },
            Outcome::Drop => continue,
            Outcome::Fail(error) => TaskResult::Failed { seq, error },
        };

        // sem consumidor, continua drenando a entrada para não travar a fonte
        if results.send(result).await.is_err() {
            debug!(worker_id, seq, "Stream de resultados descartado, registro perdido");
        }
    }
    debug!(worker_id, "Worker encerrado");
}

/// Stream de resultados do pool, em ordem de conclusão
pub struct ResultStream<T> {
    rx: mpsc::Receiver<TaskResult<T>>,
}

impl<T> ResultStream<T> {
    /// Próximo resultado; `None` quando o pool fechou e todos os workers saíram
    pub async fn recv(&mut self) -> Option<TaskResult<T>> {
        self.rx.recv().await
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = TaskResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<I, O> std::fmt::Debug for WorkerPool<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("state", &PoolState::from_u8(self.state.load(Ordering::Acquire)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::transform::common::{FilterMapTransform, MapTransform, TryMapTransform};
    use futures::StreamExt;
    use std::collections::HashSet;
    use std::time::Duration;

    async fn drain<T: Send + 'static>(stream: ResultStream<T>) -> Vec<TaskResult<T>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_zero_pool_size_is_config_error() {
        let err = WorkerPool::<u32, u32>::new(MapTransform::new(|x: u32| x), 0).unwrap_err();
        assert!(matches!(err, ETLError::Config(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_task_produces_one_result() {
        let mut pool = WorkerPool::new(MapTransform::new(|x: u32| x * 2), 8).unwrap();
        let sink = tokio::spawn(drain(pool.results().unwrap()));

        for i in 0..500u32 {
            pool.submit(i).await.unwrap();
        }
        pool.close().await.unwrap();

        let results = sink.await.unwrap();
        assert_eq!(results.len(), 500);
        let values: HashSet<u32> = results.into_iter().filter_map(TaskResult::into_record).collect();
        assert_eq!(values, (0..500u32).map(|x| x * 2).collect());
        assert_eq!(pool.state(), PoolState::Closed);
    }

    #[tokio::test]
    async fn test_drops_are_not_sent_and_failures_are() {
        let mut pool = WorkerPool::new(
            TryMapTransform::new(|x: i32| if x < 0 { Err("negativo") } else { Ok(x) }),
            2,
        )
        .unwrap();
        let sink = tokio::spawn(drain(pool.results().unwrap()));
        for x in [1, -1, 2] {
            pool.submit(x).await.unwrap();
        }
        pool.close().await.unwrap();
        let results = sink.await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().any(|r| matches!(
            r,
            TaskResult::Failed { seq: 2, error: TransformError::Failed(_) }
        )));

        let mut pool = WorkerPool::new(FilterMapTransform::new(|x: i32| (x % 2 == 0).then_some(x)), 2).unwrap();
        let sink = tokio::spawn(drain(pool.results().unwrap()));
        for x in 0..10 {
            pool.submit(x).await.unwrap();
        }
        pool.close().await.unwrap();
        assert_eq!(sink.await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_submit_after_close_fails_without_blocking() {
        let mut pool = WorkerPool::new(MapTransform::new(|x: u8| x), 1).unwrap();
        let sink = tokio::spawn(drain(pool.results().unwrap()));
        pool.close().await.unwrap();

        let attempt = tokio::time::timeout(Duration::from_secs(1), pool.submit(1)).await;
        assert!(matches!(attempt, Ok(Err(ETLError::PoolClosed))));
        assert!(sink.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_close_is_rejected() {
        let mut pool = WorkerPool::new(MapTransform::new(|x: u8| x), 2).unwrap();
        let _stream = pool.results().unwrap();
        pool.close().await.unwrap();
        assert!(matches!(pool.close().await, Err(ETLError::PoolClosed)));
        assert_eq!(pool.state(), PoolState::Closed);
    }

    #[tokio::test]
    async fn test_results_handed_out_once() {
        let mut pool = WorkerPool::new(MapTransform::new(|x: u8| x), 1).unwrap();
        let _stream = pool.results().unwrap();
        assert!(matches!(pool.results(), Err(ETLError::Pipeline(_))));
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_panic_does_not_shrink_pool() {
        let mut pool = WorkerPool::new(
            MapTransform::new(|x: u32| {
                if x % 3 == 0 {
                    panic!("múltiplo de três: {}", x);
                }
                x
            }),
            1,
        )
        .unwrap();
        let sink = tokio::spawn(drain(pool.results().unwrap()));
        for x in 0..9u32 {
            pool.submit(x).await.unwrap();
        }
        pool.close().await.unwrap();

        let results = sink.await.unwrap();
        let panicked = results
            .iter()
            .filter(|r| matches!(r, TaskResult::Failed { error: TransformError::Panicked(_), .. }))
            .count();
        assert_eq!(results.len(), 9);
        assert_eq!(panicked, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_waits_for_a_free_worker() {
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate_rx);
        let mut pool = WorkerPool::new(
            MapTransform::new(move |x: u32| {
                let _ = gate.lock().map(|rx| rx.recv());
                x
            }),
            1,
        )
        .unwrap();
        let mut stream = pool.results().unwrap();

        // worker ocupado com o 1º, canal guarda o 2º: o 3º precisa esperar
        let pool = Arc::new(pool);
        let submitter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                for x in 0..3u32 {
                    pool.submit(x).await.unwrap();
                }
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!submitter.is_finished());

        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }
        let mut seen = 0;
        while seen < 3 {
            stream.recv().await.unwrap();
            seen += 1;
        }
        submitter.await.unwrap();
    }
}
