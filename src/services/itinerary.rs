//! Per-stop timing for a chosen visiting order.
//!
//! Walks the order sequentially with the same leg arithmetic the scheduler
//! uses, so the legs of a feasible schedule add up to its total cost exactly.
//! It does NOT re-optimise the order.

use crate::services::routing::TravelTimeMatrix;
use crate::services::scheduler::Leg;
use crate::types::{ItineraryStop, RouteSchedule, Task};

/// Compute arrival, wait, service start and departure for every stop.
///
/// Returns an empty itinerary for an infeasible schedule.
pub fn build_itinerary(
    tasks: &[Task],
    matrix: &TravelTimeMatrix,
    current_minute: f64,
    schedule: &RouteSchedule,
) -> Vec<ItineraryStop> {
    if !schedule.is_feasible() {
        return vec![];
    }

    let mut stops = Vec::with_capacity(schedule.sequence.len());
    let mut clock = current_minute;
    let mut node = 0;

    for &idx in &schedule.sequence {
        let task = &tasks[idx];
        let leg = Leg::compute(task, matrix.minutes(node, idx + 1), clock);

        let arrival = clock + leg.travel;
        let service_start = arrival + leg.wait;

        stops.push(ItineraryStop {
            task_id: task.id.clone(),
            travel_minutes: leg.travel,
            wait_minutes: leg.wait,
            arrival_minute: arrival,
            service_start_minute: service_start,
            departure_minute: clock + leg.cost(),
        });

        clock += leg.cost();
        node = idx + 1;
    }

    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scheduler::RouteScheduler;

    fn seed() -> (Vec<Task>, TravelTimeMatrix) {
        let tasks = vec![Task::new("A", 600, 660, 30), Task::new("B", 630, 690, 30)];
        let matrix = TravelTimeMatrix::new(vec![
            vec![0.0, 10.0, 40.0],
            vec![10.0, 0.0, 15.0],
            vec![40.0, 15.0, 0.0],
        ])
        .unwrap();
        (tasks, matrix)
    }

    #[test]
    fn test_itinerary_for_seed_schedule() {
        let (tasks, matrix) = seed();
        let schedule = RouteScheduler::new(&tasks, &matrix, 580.0).unwrap().schedule();

        let stops = build_itinerary(&tasks, &matrix, 580.0, &schedule);

        assert_eq!(stops.len(), 2);

        assert_eq!(stops[0].task_id, "A");
        assert_eq!(stops[0].arrival_minute, 590.0);
        assert_eq!(stops[0].wait_minutes, 10.0);
        assert_eq!(stops[0].service_start_minute, 600.0);
        assert_eq!(stops[0].departure_minute, 630.0);

        assert_eq!(stops[1].task_id, "B");
        assert_eq!(stops[1].travel_minutes, 15.0);
        assert_eq!(stops[1].arrival_minute, 645.0);
        assert_eq!(stops[1].wait_minutes, 0.0);
        assert_eq!(stops[1].departure_minute, 675.0);
    }

    #[test]
    fn test_itinerary_legs_sum_to_total_cost() {
        let (tasks, matrix) = seed();
        let schedule = RouteScheduler::new(&tasks, &matrix, 580.0).unwrap().schedule();

        let stops = build_itinerary(&tasks, &matrix, 580.0, &schedule);
        let total: f64 = stops
            .iter()
            .zip(&schedule.sequence)
            .map(|(s, &idx)| s.travel_minutes + s.wait_minutes + tasks[idx].duration_minutes)
            .sum();

        assert_eq!(total, schedule.total_cost);
        assert_eq!(stops.last().unwrap().departure_minute - 580.0, schedule.total_cost);
    }

    #[test]
    fn test_itinerary_empty_when_infeasible() {
        let (tasks, matrix) = seed();
        let stops = build_itinerary(&tasks, &matrix, 580.0, &RouteSchedule::infeasible());
        assert!(stops.is_empty());
    }

    #[test]
    fn test_every_stop_meets_its_deadline() {
        let tasks = vec![
            Task::new("A", 545, 700, 20),
            Task::new("B", 610, 720, 15),
            Task::new("C", 500, 650, 45),
        ];
        let matrix = TravelTimeMatrix::new(vec![
            vec![0.0, 7.0, 13.0, 5.0],
            vec![7.0, 0.0, 6.0, 9.0],
            vec![13.0, 6.0, 0.0, 12.0],
            vec![5.0, 9.0, 12.0, 0.0],
        ])
        .unwrap();
        let schedule = RouteScheduler::new(&tasks, &matrix, 530.0).unwrap().schedule();
        assert!(schedule.is_feasible());

        let stops = build_itinerary(&tasks, &matrix, 530.0, &schedule);

        for (stop, &idx) in stops.iter().zip(&schedule.sequence) {
            assert!(stop.service_start_minute >= tasks[idx].start_minute);
            assert!(stop.service_start_minute <= tasks[idx].end_minute);
        }
    }
}
